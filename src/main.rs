use env_logger::Env;
use siswa_admin::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = Config::load()?;
    siswa_admin::start_server(config).await
}
