use env_logger::Env;
use nightlight_remote::{app::App, Opt};
use structopt::StructOpt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let opt: Opt = Opt::from_args();
    let app = App::new(&opt);

    let message = app.run(&opt.command).await?;
    println!("{}", message);

    Ok(())
}
