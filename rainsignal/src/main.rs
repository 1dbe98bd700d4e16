use clap::Parser;
use rainsignal::app::RainsignalCliArguments;

fn main() {
    env_logger::init();
    log::debug!("cwd: {:?}", std::env::current_dir());
    let args = RainsignalCliArguments::parse();
    match args.op.run() {
        Ok(_) => log::info!("finished."),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
