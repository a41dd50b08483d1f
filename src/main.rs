use std::env;
use std::path::PathBuf;

use clap::{command, Parser, Subcommand};
use flexi_logger::{FileSpec, Logger};
use log::{error, info};

use foxj::package::{self, SignOptions};
use foxj::scaffold;
use foxj::{default_format, FoxError, FoxExit, JudgeSession};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  #[command(about = "Pack a problem workspace into a package file")]
  Pack {
    #[arg(help = "Problem configuration JSON")]
    config: PathBuf,

    #[arg(help = "Output package file")]
    output: PathBuf,

    #[arg(short, long, help = "Enable digital sign (GPG)")]
    sign: bool,

    #[arg(long, requires = "sign", help = "GPG key id used for signing")]
    gpg_key: Option<String>,

    #[arg(long, requires = "sign", help = "Private key passphrase")]
    passphrase: Option<String>,
  },

  #[command(about = "Print package information")]
  Info {
    #[arg(help = "Package file")]
    package: PathBuf,

    #[arg(short, long, help = "Print signature info")]
    sign: bool,
  },

  #[command(about = "Create a problem workspace")]
  Init {
    #[arg(help = "Workspace directory to create")]
    workdir: PathBuf,

    #[arg(long, help = "Materialise a bundled example problem")]
    name: Option<String>,
  },

  #[command(about = "Judge a submission")]
  Run {
    #[arg(help = "Problem configuration JSON")]
    config: PathBuf,
  },

  #[command(about = "Generate a default problem configuration")]
  Gen {
    #[arg(help = "Output configuration JSON")]
    output: PathBuf,
  },
}

fn dispatch(command: Commands) -> Result<(), FoxError> {
  match command {
    Commands::Pack {
      config,
      output,
      sign,
      gpg_key,
      passphrase,
    } => {
      let sign = if sign {
        if passphrase.is_some() {
          log::warn!("Passing a passphrase on the command line can be insecure");
        }
        let key = gpg_key.ok_or_else(|| FoxError::cli("please set a gpg key id"))?;
        Some(SignOptions { key, passphrase })
      } else {
        None
      };
      package::pack_problem(&config, &output, sign)
    }

    Commands::Info { package, sign } => {
      let info = package::read_package(&package)?;
      println!("version:  {}", info.version);
      println!("digest:   sha256:{}", info.digest);
      println!("signed:   {}", info.signed());
      println!("files:    {}", info.files.len());
      for (name, size) in info.files.iter() {
        println!("  {} ({} bytes)", name, size);
      }
      if sign {
        let report = package::verify_signature(&package)?;
        println!("{}", report.trim());
      }
      Ok(())
    }

    Commands::Init { workdir, name } => {
      let config = scaffold::init_problem_workdir(&workdir, name.as_deref())?;
      println!("{}", config.to_string_lossy());
      Ok(())
    }

    Commands::Run { config } => {
      let mut session = JudgeSession::from_config_file(&config)?;
      let rollup = foxj::judge::judge_session(&mut session)?;
      println!("{}", serde_json::to_string_pretty(&rollup)?);
      Ok(())
    }

    Commands::Gen { output } => scaffold::generate_config_file(&output),
  }
}

fn bootstrap() -> Result<(), FoxError> {
  Logger::try_with_str("foxj=info")?
    .log_to_file(
      FileSpec::default()
        .directory(env::var("FOXJ_LOG").unwrap_or("./logs/".into()))
        .basename("foxj")
        .discriminant(format!(
          "{}",
          chrono::offset::Local::now().format("%Y-%m-%d")
        ))
        .suppress_timestamp(),
    )
    .append()
    .format_for_files(default_format)
    .start()?;

  info!("Start running foxj");

  let cli = Cli::parse();
  match dispatch(cli.command) {
    Ok(_) => {
      info!("Running foxj finished");
      Ok(())
    }
    Err(err) => {
      error!("Running foxj failed: {}", err);
      Err(err)
    }
  }
}

fn main() -> FoxExit {
  match bootstrap() {
    Ok(_) => FoxExit::Ok,
    Err(err) => FoxExit::Err(err),
  }
}
