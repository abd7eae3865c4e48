//! # CLI Interface
//!
//! Defines the command-line argument structure for `nftlend-node` using
//! `clap` derive. Supports three subcommands: `run`, `params`, and
//! `version`. Every lending parameter can also be supplied through an
//! `NFTLEND_*` environment variable.

use clap::{Args, Parser, Subcommand, ValueEnum};

use nftlend_protocol::config::{
    LendingParams, LiquidationBeneficiary, DEFAULT_CUSTODIAN, DEFAULT_INTEREST_RATE_BPS,
    DEFAULT_LOAN_TERM_SECS, DEFAULT_MAX_LTV_BPS, DEFAULT_TREASURY,
};
use nftlend_protocol::units::ValueAmount;

/// Collateralized NFT lending node.
///
/// Runs the loan engine against in-memory value, reward and collateral
/// ledgers, serves the REST API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "nftlend-node",
    about = "Collateralized NFT lending node",
    version,
    propagate_version = true
)]
pub struct NftLendCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API and metrics servers.
    Run(RunArgs),
    /// Validate the lending parameters and print them as JSON.
    Params(ParamsArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Address both servers bind to.
    #[arg(long, env = "NFTLEND_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the REST API.
    #[arg(long, env = "NFTLEND_API_PORT", default_value_t = 9841)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "NFTLEND_METRICS_PORT", default_value_t = 9842)]
    pub metrics_port: u16,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "NFTLEND_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Enable the devnet helpers (`POST /assets`, `POST /faucet`).
    #[arg(long, env = "NFTLEND_DEVNET", default_value_t = true, action = clap::ArgAction::Set)]
    pub devnet: bool,

    #[command(flatten)]
    pub params: ParamsArgs,
}

/// Who receives seized collateral.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeneficiaryArg {
    Treasury,
    Liquidator,
}

impl From<BeneficiaryArg> for LiquidationBeneficiary {
    fn from(arg: BeneficiaryArg) -> Self {
        match arg {
            BeneficiaryArg::Treasury => LiquidationBeneficiary::Treasury,
            BeneficiaryArg::Liquidator => LiquidationBeneficiary::Liquidator,
        }
    }
}

/// Deployment-time lending parameters. Immutable once the node starts.
#[derive(Args, Debug, Clone)]
pub struct ParamsArgs {
    /// Loan term in seconds.
    #[arg(long, env = "NFTLEND_TERM_SECS", default_value_t = DEFAULT_LOAN_TERM_SECS)]
    pub term_secs: u64,

    /// Interest over one full term, in basis points of principal.
    #[arg(long, env = "NFTLEND_INTEREST_RATE_BPS", default_value_t = DEFAULT_INTEREST_RATE_BPS)]
    pub interest_rate_bps: u32,

    /// Maximum loan-to-value ratio in basis points.
    #[arg(long, env = "NFTLEND_MAX_LTV_BPS", default_value_t = DEFAULT_MAX_LTV_BPS)]
    pub max_ltv_bps: u32,

    /// Fixed valuation of one collateral asset, as a decimal amount.
    #[arg(long, env = "NFTLEND_COLLATERAL_VALUE", default_value = "1000")]
    pub collateral_value: ValueAmount,

    /// Cap on aggregate outstanding principal, as a decimal amount.
    #[arg(long, env = "NFTLEND_RESERVE_CAP", default_value = "1000000")]
    pub reserve_cap: ValueAmount,

    /// Holding identity for collateral in custody.
    #[arg(long, env = "NFTLEND_CUSTODIAN", default_value = DEFAULT_CUSTODIAN)]
    pub custodian: String,

    /// Identity receiving interest payments.
    #[arg(long, env = "NFTLEND_TREASURY", default_value = DEFAULT_TREASURY)]
    pub treasury: String,

    /// Recipient of seized collateral.
    #[arg(
        long,
        env = "NFTLEND_LIQUIDATION_BENEFICIARY",
        value_enum,
        default_value_t = BeneficiaryArg::Treasury
    )]
    pub liquidation_beneficiary: BeneficiaryArg,
}

impl ParamsArgs {
    /// Assembles the parameter bundle. Validation happens when the ledger
    /// is constructed.
    pub fn to_params(&self) -> LendingParams {
        LendingParams {
            term_secs: self.term_secs,
            interest_rate_bps: self.interest_rate_bps,
            max_ltv_bps: self.max_ltv_bps,
            collateral_value: self.collateral_value,
            reserve_cap: self.reserve_cap,
            custodian: self.custodian.clone(),
            treasury: self.treasury.clone(),
            liquidation_beneficiary: self.liquidation_beneficiary.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        NftLendCli::command().debug_assert();
    }

    #[test]
    fn defaults_match_protocol_defaults() {
        let cli = NftLendCli::try_parse_from(["nftlend-node", "params"]).unwrap();
        let Commands::Params(args) = cli.command else {
            panic!("expected params subcommand");
        };
        assert_eq!(args.to_params(), LendingParams::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = NftLendCli::try_parse_from([
            "nftlend-node",
            "run",
            "--api-port",
            "8080",
            "--term-secs",
            "3600",
            "--collateral-value",
            "2500.5",
            "--liquidation-beneficiary",
            "liquidator",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.api_port, 8080);
        assert!(args.devnet);

        let params = args.params.to_params();
        assert_eq!(params.term_secs, 3600);
        assert_eq!(params.collateral_value.to_string(), "2500.5");
        assert_eq!(
            params.liquidation_beneficiary,
            LiquidationBeneficiary::Liquidator
        );
    }

    #[test]
    fn malformed_amount_rejected() {
        let result =
            NftLendCli::try_parse_from(["nftlend-node", "params", "--reserve-cap", "1.2.3"]);
        assert!(result.is_err());
    }
}
