use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match revcrawl::app::run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("revcrawl: {err:#}");
            ExitCode::FAILURE
        }
    }
}
