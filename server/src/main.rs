use clap::Parser;
use products_server::Options;

#[async_std::main]
async fn main() -> anyhow::Result<()> {
    let opt = Options::parse();
    model::init_logging_as(opt.log_format());
    opt.serve().await
}
