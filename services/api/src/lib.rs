mod batch;
mod cli;
mod infra;
mod quote;
mod routes;
mod server;

use sme_pricing::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
