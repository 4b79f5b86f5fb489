use std::process::ExitCode;

#[actix_web::main]
async fn main() -> ExitCode {
    match sheetlens_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sheetlens: {}", err);
            ExitCode::FAILURE
        }
    }
}
