fn main() {
    if let Err(err) = sheet2sql::run() {
        let (message, code) = sheet2sql::describe_failure(&err);
        eprintln!("error: {message}");
        std::process::exit(code);
    }
}
