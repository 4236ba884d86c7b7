// This file is part of Gear.
//
// Copyright (C) 2025 Gear Technologies Inc.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Stake table transporter.

mod commands;
mod params;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use commands::Command;
use params::{MergeParams, Params};
use std::{env, fs, path::Path};
use tracing_subscriber::EnvFilter;

/// Optional configuration file looked up in the working directory.
const CONFIG_FILE: &str = ".transporter.toml";

/// Calculates stake table roots on the source chain and transports them to
/// destination chains.
#[derive(Debug, Parser)]
#[command(name = "transporter", version, about)]
struct Args {
    #[clap(flatten)]
    params: Params,

    #[command(subcommand)]
    command: Command,
}

fn file_params(path: &Path) -> Result<Option<Params>> {
    if fs::metadata(path).is_err() {
        return Ok(None);
    }

    // logging is not initialized yet, its level may come from the file.
    println!("Using configuration file: {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    let params = toml::from_str(&content)
        .with_context(|| format!("failed to parse `{}`", path.display()))?;

    Ok(Some(params))
}

fn init_logger(debug: bool) -> Result<()> {
    let default_directive = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args { params, command } = Args::parse();

    let params = match file_params(&env::current_dir()?.join(CONFIG_FILE))? {
        Some(file_params) => params.merge(file_params),
        None => params,
    };

    init_logger(params.debug)?;

    tokio::select! {
        res = command.exec(params) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Received SIGINT, in-flight work abandoned");
            bail!("interrupted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use transporter_common::CertificateTimestamp;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn global_options_after_subcommand() {
        let args = Args::try_parse_from([
            "transporter",
            "transport",
            "--chains",
            "1:http://localhost:8545",
            "--chains",
            "17000:http://localhost:8546",
            "--skip-chain",
            "17000",
            "--certificate-timestamp",
            "destination",
            "--debug",
        ])
        .unwrap();

        assert!(args.params.debug);
        assert_eq!(
            args.params.chain.chains,
            Some(vec![
                "1:http://localhost:8545".to_string(),
                "17000:http://localhost:8546".to_string()
            ])
        );

        let Command::Transport(transport) = args.command else {
            panic!("expected transport command");
        };
        assert_eq!(transport.skip_chains, vec![17000]);
        assert_eq!(
            transport.certificate_timestamp,
            CertificateTimestamp::Destination
        );
        assert!(!transport.skip_group_tables);
    }

    #[test]
    fn calculate_block_number() {
        let args =
            Args::try_parse_from(["transporter", "calculate", "--block-number", "42"]).unwrap();

        let Command::Calculate(calculate) = args.command else {
            panic!("expected calculate command");
        };
        assert_eq!(calculate.calculation.block_number, Some(42));
    }

    #[test]
    fn unknown_certificate_timestamp_rejected() {
        let res = Args::try_parse_from([
            "transporter",
            "transport",
            "--certificate-timestamp",
            "yesterday",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn file_params_absent() {
        let path = env::temp_dir().join("transporter-cli-missing.toml");
        assert!(file_params(&path).unwrap().is_none());
    }

    #[test]
    fn file_params_parsed() {
        let path = env::temp_dir().join(format!("transporter-cli-{}.toml", std::process::id()));
        fs::write(
            &path,
            r#"
debug = true

[chain]
cross-chain-registry = "0x0000000000000000000000000000000000000001"
chains = ["1:http://localhost:8545"]

[signer]
tx-aws-kms-key-id = "alias/transporter"
bls-aws-secret-name = "transporter/bls"
"#,
        )
        .unwrap();

        let params = file_params(&path).unwrap().unwrap();
        fs::remove_file(&path).unwrap();

        assert!(params.debug);
        assert_eq!(params.chain.chains.as_deref().map(<[_]>::len), Some(1));
        assert_eq!(
            params.signer.tx_aws_kms_key_id.as_deref(),
            Some("alias/transporter")
        );
    }

    #[test]
    fn file_params_unknown_field_rejected() {
        let path = env::temp_dir().join(format!(
            "transporter-cli-unknown-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "verbose = true\n").unwrap();

        let res = file_params(&path);
        fs::remove_file(&path).unwrap();

        assert!(res.is_err());
    }
}
