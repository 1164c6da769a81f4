//! `config`: inspect or create the config file.

use crestron_config::{Config, save_config_to};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::BridgeError;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), BridgeError> {
    let path = crate::config::effective_path(global);

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let mut cfg = crate::config::load(global)?;
            if cfg.token.is_some() {
                cfg.token = Some(REDACTED.into());
            }
            let rendered = toml::to_string_pretty(&cfg).map_err(|e| BridgeError::Config {
                message: e.to_string(),
                path: path.display().to_string(),
            })?;
            print!("{rendered}");
        }
        ConfigCommand::Init {
            host,
            token_env,
            force,
        } => {
            if path.exists() && !force {
                return Err(BridgeError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let cfg = Config {
                host: Some(host),
                token_env: Some(token_env),
                ..Config::default()
            };
            save_config_to(&cfg, &path).map_err(|e| BridgeError::from_config(e, &path))?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
