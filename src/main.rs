use gallio_sensor::{
    cli, errors,
    config::{Mode, RunConfiguration},
    executor::{AbortHandle, Runner},
    logging,
    picker::toml::Config,
    printer,
    publish::RecordingPublisher,
    sensor::{GallioSensor, Module, Registry},
};

use cli::Opts;
use errors::SensorError;
use structopt::StructOpt;
use tokio::runtime;
use tracing::warn;

fn dry_run(modules: &[Module]) {
    use colored::*;
    for module in modules {
        let plan = RunConfiguration::resolve(&module.settings, &module.base_dir)
            .and_then(|conf| match conf.mode {
                Mode::Skip => Ok("(skip)".to_string()),
                Mode::ReuseReport => Ok(format!(
                    "(reuse {})",
                    conf.reports_path.unwrap_or_default()
                )),
                Mode::Run => {
                    let report = conf.report_target();
                    let (program, args) = Runner::new(&conf).command_line(&report)?;
                    let args: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
                    Ok(format!("{} {}", program.to_string_lossy(), args.join(" ")))
                }
            })
            .unwrap_or_else(|err| format!("error: {}", err));
        println!("{}\n  {}", module.name.blue(), plan);
    }
}

fn run() -> Result<i32, SensorError> {
    let opts = Opts::from_args();
    logging::init(opts.verbose);

    let modules = opts.select(Config::from_path(&opts.dir)?.into_modules(&opts.dir))?;

    // Print out the runner command for each module in dry run mode.
    if opts.dry_run {
        dry_run(&modules);
        return Ok(0);
    }

    let (abort, signal) = AbortHandle::new();
    let mut registry = Registry::new();
    registry.register(GallioSensor::with_abort(signal));
    let mut publisher = RecordingPublisher::new();

    let runtime = runtime::Builder::new_multi_thread().enable_all().build()?;
    let analyses = runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, aborting analysis");
                abort.abort();
            }
        });
        registry.analyze(&modules, &mut publisher).await
    });

    if opts.measures {
        print!("{}", printer::measures_str(&publisher));
    }
    print!("{}", printer::summary(&analyses));

    Ok(analyses.iter().filter(|a| a.is_failed()).count() as i32)
}

fn main() {
    std::process::exit(match run() {
        Err(err) => {
            println!("error: {}", err);
            1
        }
        Ok(failed) => failed,
    })
}
