use std::{net::Ipv4Addr, time::Duration};

use clap::{Parser, Subcommand};
use http::HeaderMap;
use jsonrpsee::{core::client::ClientT, http_client::HttpClientBuilder};
use predmarket::{state::Side, types::Address};
use predmarket_app_rpc_api::RpcClient;
use tracing_subscriber::layer::SubscriberExt as _;
use url::{Host, Url};

#[derive(Clone, Debug, Subcommand)]
#[command(arg_required_else_help(true))]
pub enum Command {
    /// Buy outcome shares from a market pool
    BuyShares {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        buyer: Address,
        #[arg(long)]
        side: Side,
        #[arg(long)]
        payment: u64,
        /// Fail the trade if it would mint fewer shares than this
        #[arg(default_value_t = 0, long)]
        min_shares_out: u64,
    },
    /// Get the collateral balance of an account
    CollateralBalance {
        account: Address,
    },
    /// Create a new market.
    /// Returns the new market ID as a hex string.
    CreateMarket {
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        question: String,
        #[arg(long)]
        description: String,
    },
    /// Deposit collateral to an account
    Deposit {
        account: Address,
        #[arg(long)]
        amount: u64,
    },
    /// View detailed information for a specific market
    GetMarket {
        /// Market ID as hex
        market_id: String,
    },
    /// Seed both pools of a market with collateral, opening it for trading
    InitializeMarket {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        deposit: u64,
    },
    /// List all markets
    ListMarkets,
    /// Get the number of markets
    MarketCount,
    /// Redeem winning shares for collateral after resolution
    RedeemShares {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        redeemer: Address,
    },
    /// Resolve a market to its final outcome
    ResolveMarket {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        outcome: Side,
    },
    /// Sell outcome shares back to a market pool
    SellShares {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        seller: Address,
        #[arg(long)]
        side: Side,
        #[arg(long)]
        shares_in: u64,
        /// Fail the trade if it would pay out less than this
        #[arg(default_value_t = 0, long)]
        min_payment_out: u64,
    },
    /// Get an account's share balance on one side of a market
    ShareBalance {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        side: Side,
        #[arg(long)]
        account: Address,
    },
    /// Get the spot price for one side of a market, scaled by 10^18
    SpotPrice {
        /// Market ID as hex
        market_id: String,
        #[arg(long)]
        side: Side,
    },
    /// Stop the node
    Stop,
    /// Withdraw collateral from an account
    Withdraw {
        account: Address,
        #[arg(long)]
        amount: u64,
    },
}

const DEFAULT_RPC_HOST: Host = Host::Ipv4(Ipv4Addr::LOCALHOST);

const DEFAULT_RPC_PORT: u16 = 7553;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Host used for requests to the RPC server
    #[arg(default_value_t = DEFAULT_RPC_HOST, long, value_parser = Host::parse)]
    pub rpc_host: Host,
    /// Port used for requests to the RPC server
    #[arg(default_value_t = DEFAULT_RPC_PORT, long)]
    pub rpc_port: u16,
    /// Timeout for RPC requests in seconds.
    #[arg(default_value_t = DEFAULT_TIMEOUT_SECS, long = "timeout")]
    timeout_secs: u64,
    #[arg(short, long, help = "Enable verbose HTTP output")]
    pub verbose: bool,
}

impl Cli {
    pub fn new(
        command: Command,
        rpc_host: Option<Host>,
        rpc_port: Option<u16>,
        timeout_secs: Option<u64>,
        verbose: Option<bool>,
    ) -> Self {
        Self {
            command,
            rpc_host: rpc_host.unwrap_or(DEFAULT_RPC_HOST),
            rpc_port: rpc_port.unwrap_or(DEFAULT_RPC_PORT),
            timeout_secs: timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            verbose: verbose.unwrap_or(false),
        }
    }

    fn rpc_url(&self) -> url::Url {
        Url::parse(&format!("http://{}:{}", self.rpc_host, self.rpc_port))
            .unwrap()
    }
}

/// Handle a command, returning CLI output
async fn handle_command<RpcClient>(
    rpc_client: &RpcClient,
    command: Command,
) -> anyhow::Result<String>
where
    RpcClient: ClientT + Sync,
{
    Ok(match command {
        Command::BuyShares {
            market_id,
            buyer,
            side,
            payment,
            min_shares_out,
        } => {
            let shares = rpc_client
                .buy_shares(market_id, buyer, side, payment, min_shares_out)
                .await?;
            format!("{shares}")
        }
        Command::CollateralBalance { account } => {
            let balance = rpc_client.collateral_balance(account).await?;
            format!("{balance}")
        }
        Command::CreateMarket {
            owner,
            question,
            description,
        } => {
            rpc_client
                .create_market(owner, question, description)
                .await?
        }
        Command::Deposit { account, amount } => {
            let balance = rpc_client.deposit(account, amount).await?;
            format!("{balance}")
        }
        Command::GetMarket { market_id } => {
            let details = rpc_client.get_market(market_id).await?;
            let mut output = String::new();
            output.push_str(&format!("Market: {}\n", details.market_id));
            output.push_str(&format!("Question: {}\n", details.question));
            output
                .push_str(&format!("Description: {}\n", details.description));
            output.push_str(&format!("Owner: {}\n", details.owner));
            output.push_str(&format!("State: {}\n", details.state));
            match details.outcome {
                Some(outcome) => {
                    output.push_str(&format!("Outcome: {outcome}\n"));
                }
                None => output.push_str("Outcome: unresolved\n"),
            }
            output.push_str(&format!(
                "Collateral reserve: {}\n",
                details.collateral_reserve
            ));
            output.push_str(&format!(
                "Pools: {} YES / {} NO\n",
                details.yes_pool, details.no_pool
            ));
            output.push_str(&format!(
                "Shares issued: {} YES / {} NO\n",
                details.total_yes_supply, details.total_no_supply
            ));
            match (&details.yes_price, &details.no_price) {
                (Some(yes_price), Some(no_price)) => {
                    output.push_str(&format!(
                        "Spot prices: {yes_price} YES / {no_price} NO\n"
                    ));
                }
                _ => output.push_str("Spot prices: not yet initialized\n"),
            }
            output.push_str(&format!("Created at: {}", details.created_at));
            output
        }
        Command::InitializeMarket {
            market_id,
            owner,
            deposit,
        } => {
            let pool_per_side = rpc_client
                .initialize_market(market_id, owner, deposit)
                .await?;
            format!("{pool_per_side}")
        }
        Command::ListMarkets => {
            let markets = rpc_client.list_markets().await?;
            if markets.is_empty() {
                "No markets found.".to_string()
            } else {
                let mut output = String::new();
                for market in &markets {
                    output.push_str(&format!(
                        "{} [{}] {}\n",
                        market.market_id, market.state, market.question
                    ));
                    output.push_str(&format!(
                        "    reserve: {}, pools: {} YES / {} NO\n",
                        market.collateral_reserve,
                        market.yes_pool,
                        market.no_pool
                    ));
                }
                output.push_str(&format!("\nTotal markets: {}", markets.len()));
                output
            }
        }
        Command::MarketCount => {
            let count = rpc_client.market_count().await?;
            format!("{count}")
        }
        Command::RedeemShares {
            market_id,
            redeemer,
        } => {
            let redemption =
                rpc_client.redeem_shares(market_id, redeemer).await?;
            serde_json::to_string_pretty(&redemption)?
        }
        Command::ResolveMarket {
            market_id,
            owner,
            outcome,
        } => {
            let () = rpc_client
                .resolve_market(market_id, owner, outcome)
                .await?;
            String::default()
        }
        Command::SellShares {
            market_id,
            seller,
            side,
            shares_in,
            min_payment_out,
        } => {
            let payment = rpc_client
                .sell_shares(market_id, seller, side, shares_in, min_payment_out)
                .await?;
            format!("{payment}")
        }
        Command::ShareBalance {
            market_id,
            side,
            account,
        } => {
            let balance =
                rpc_client.share_balance(market_id, side, account).await?;
            format!("{balance}")
        }
        Command::SpotPrice { market_id, side } => {
            rpc_client.spot_price(market_id, side).await?
        }
        Command::Stop => {
            let () = rpc_client.stop().await?;
            String::default()
        }
        Command::Withdraw { account, amount } => {
            let balance = rpc_client.withdraw(account, amount).await?;
            format!("{balance}")
        }
    })
}

fn set_tracing_subscriber() -> anyhow::Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stdout()))
        .with_file(true)
        .with_line_number(true);

    let subscriber = tracing_subscriber::registry().with(stdout_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<String> {
        if self.verbose {
            set_tracing_subscriber()?;
        }
        let request_id = uuid::Uuid::new_v4().as_simple().to_string();
        tracing::info!(%request_id);
        let builder = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(self.timeout_secs))
            .set_max_logging_length(1024)
            .set_headers(HeaderMap::from_iter([(
                http::header::HeaderName::from_static("x-request-id"),
                http::header::HeaderValue::from_str(&request_id)?,
            )]));
        let client = builder.build(self.rpc_url())?;
        let result = handle_command(&client, self.command).await?;
        Ok(result)
    }
}
