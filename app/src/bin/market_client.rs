use std::{env, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use app::config::load_config;
use engine::{
    balances::BalanceTracker,
    config::EngineConfig,
    http_pool::HttpPool,
    lifecycle::LifecycleController,
    market_reader::MarketStateReader,
    metrics::Metrics,
    notify::TracingNotifier,
    odds_source::QuoteSourceAdapter,
    poller::{poll_interval, MarketPoller},
    rpc::JsonRpcClient,
    trade::TradeExecutor,
    view::MarketView,
    wallet::connect_wallet,
};
use engine_core::{
    parse_amount, AccountSession, BalanceSet, ChainReader, MarketError, Notice, Notifier, Outcome,
    QuoteSource, TokenSymbol, TxReceipt,
};
use prometheus::Registry;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: market-client [config.json] <watch | balances | buy <win|draw|lose> <amount> | approve <amount> | admin <open <start> <end> | close | reset | resolve <0|1|2>>>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Admin {
    Open { start: u64, end: u64 },
    Close,
    Reset,
    Resolve(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Watch,
    Balances,
    Buy { outcome: Outcome, amount: Decimal },
    Approve { amount: Decimal },
    Admin(Admin),
}

fn parse_args(args: &[String]) -> Result<(PathBuf, Command)> {
    let (config, rest) = match args.first() {
        Some(first) if first.ends_with(".json") => (PathBuf::from(first), &args[1..]),
        _ => (PathBuf::from("config.json"), args),
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let amount = |s: &str| parse_amount(s).map_err(|e| anyhow!("{}", e));
    let outcome = |s: &str| s.parse::<Outcome>().map_err(|e| anyhow!("{}", e));
    let secs = |s: &str| s.parse::<u64>().with_context(|| format!("bad timestamp '{}'", s));
    let cmd = match rest.as_slice() {
        ["watch"] => Command::Watch,
        ["balances"] => Command::Balances,
        ["buy", o, a] => Command::Buy {
            outcome: outcome(*o)?,
            amount: amount(*a)?,
        },
        ["approve", a] => Command::Approve { amount: amount(*a)? },
        ["admin", "open", s, e] => Command::Admin(Admin::Open {
            start: secs(*s)?,
            end: secs(*e)?,
        }),
        ["admin", "close"] => Command::Admin(Admin::Close),
        ["admin", "reset"] => Command::Admin(Admin::Reset),
        ["admin", "resolve", o] => Command::Admin(Admin::Resolve(outcome(*o)?)),
        _ => bail!(USAGE),
    };
    Ok((config, cmd))
}

/// Prints action outcomes for the operator and mirrors them into the log.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::Info(msg) => println!("{}", msg),
            Notice::Confirmed { action, receipt } => {
                println!("{} confirmed: {}", action, receipt.tx_hash)
            }
            Notice::Failed { action, error } => eprintln!("{} failed: {}", action, error),
        }
        TracingNotifier.notify(notice);
    }
}

fn print_balances(set: &BalanceSet) {
    println!("account {}", set.account);
    for symbol in TokenSymbol::ALL {
        if let Some(balance) = set.get(symbol) {
            println!("  {:<5} {}", symbol.to_string(), balance);
        }
    }
}

struct Client {
    cfg: EngineConfig,
    pool: Arc<HttpPool>,
    metrics: Arc<Metrics>,
    chain: Arc<dyn ChainReader>,
    notifier: ConsoleNotifier,
}

impl Client {
    fn new(cfg: EngineConfig, registry: &Registry) -> Result<Self> {
        let pool = Arc::new(HttpPool::new(&cfg.http, registry).context("create http pool")?);
        let metrics = Metrics::new(registry).context("register metrics")?;
        let chain: Arc<dyn ChainReader> = Arc::new(JsonRpcClient::new(pool.clone(), &cfg.chain.rpc_url));
        Ok(Self {
            cfg,
            pool,
            metrics,
            chain,
            notifier: ConsoleNotifier,
        })
    }

    fn balances(&self) -> Arc<BalanceTracker> {
        Arc::new(BalanceTracker::new(
            self.chain.clone(),
            &self.cfg.tokens,
            self.metrics.clone(),
        ))
    }

    /// A missing wallet is reported and leaves the session empty; the action
    /// itself then fails with `NoSigner`.
    async fn session(&self) -> Option<AccountSession> {
        match connect_wallet(&self.cfg.wallet, self.pool.clone(), self.metrics.clone()).await {
            Ok(session) => {
                self.notifier
                    .notify(Notice::Info(format!("connected {}", session.address)));
                Some(session)
            }
            Err(error) => {
                self.notifier.notify(Notice::Failed {
                    action: "connect wallet".to_string(),
                    error,
                });
                None
            }
        }
    }

    fn report(&self, action: &str, result: Result<TxReceipt, MarketError>) -> bool {
        match result {
            Ok(receipt) => {
                self.notifier.notify(Notice::Confirmed {
                    action: action.to_string(),
                    receipt,
                });
                true
            }
            Err(error) => {
                self.notifier.notify(Notice::Failed {
                    action: action.to_string(),
                    error,
                });
                false
            }
        }
    }

    async fn watch(&self) -> Result<()> {
        let view = Arc::new(MarketView::new());
        let odds = QuoteSourceAdapter::new(self.pool.clone(), &self.cfg.odds.url, self.metrics.clone());
        view.apply_off_chain(odds.try_fetch().await);

        let reader = Arc::new(MarketStateReader::new(self.chain.clone(), &self.cfg.chain));
        let interval = poll_interval(self.cfg.chain.poll_interval_ms);
        let handle = MarketPoller::spawn(reader, view.clone(), interval, self.metrics.clone());

        let mut tick = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tick.tick() => {
                    let snapshot = view.snapshot();
                    println!("{}", snapshot.quote);
                    match snapshot.status {
                        Some(status) => println!("{}", status),
                        None => println!("market state: -"),
                    }
                }
            }
        }
        handle.shutdown().await;
        Ok(())
    }

    async fn run(&self, cmd: Command) -> Result<bool> {
        match cmd {
            Command::Watch => self.watch().await.map(|_| true),
            Command::Balances => {
                let Some(session) = self.session().await else {
                    return Ok(false);
                };
                print_balances(&self.balances().refresh_balances(session.address).await);
                Ok(true)
            }
            Command::Buy { outcome, amount } => {
                let session = self.session().await;
                let exec = TradeExecutor::new(
                    self.chain.clone(),
                    self.cfg.swap.clone(),
                    self.cfg.tokens.clone(),
                    self.balances(),
                );
                let action = format!("buy {} {}", outcome, amount);
                match exec.buy(outcome, amount, session.as_ref()).await {
                    Ok(trade) => {
                        if let Some(receipt) = trade.approval {
                            self.report("approve", Ok(receipt));
                        }
                        self.report(&action, Ok(trade.swap));
                        print_balances(&trade.balances);
                        Ok(true)
                    }
                    Err(err) => Ok(self.report(&action, Err(err))),
                }
            }
            Command::Approve { amount } => {
                let session = self.session().await;
                let exec = TradeExecutor::new(
                    self.chain.clone(),
                    self.cfg.swap.clone(),
                    self.cfg.tokens.clone(),
                    self.balances(),
                );
                let result = exec.approve(amount, session.as_ref()).await;
                Ok(self.report(&format!("approve {}", amount), result))
            }
            Command::Admin(admin) => {
                let session = self.session().await;
                let ctl = LifecycleController::new(
                    self.cfg.chain.market_address,
                    self.cfg.lifecycle.clone(),
                );
                let s = session.as_ref();
                let (action, result) = match admin {
                    Admin::Open { start, end } => ("open market".to_string(), ctl.open(start, end, s).await),
                    Admin::Close => ("close market".to_string(), ctl.close(s).await),
                    Admin::Reset => ("reset market".to_string(), ctl.reset(s).await),
                    Admin::Resolve(o) => (format!("resolve market {}", o), ctl.resolve(o, s).await),
                };
                Ok(self.report(&action, result))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (config_path, cmd) = parse_args(&args)?;
    let cfg = load_config(&config_path).await?;
    info!(?cmd, "starting market client");

    let registry = Registry::new();
    let client = Client::new(cfg, &registry)?;
    let ok = client.run(cmd).await?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn parses_commands() {
        let (path, cmd) = parse_args(&args("local.json buy draw 12.5")).unwrap();
        assert_eq!(path, PathBuf::from("local.json"));
        assert_eq!(
            cmd,
            Command::Buy {
                outcome: Outcome::Draw,
                amount: Decimal::new(125, 1)
            }
        );
        let (path, cmd) = parse_args(&args("admin resolve 0")).unwrap();
        assert_eq!(path, PathBuf::from("config.json"));
        assert_eq!(cmd, Command::Admin(Admin::Resolve(Outcome::Win)));
        assert_eq!(
            parse_args(&args("admin open 100 200")).unwrap().1,
            Command::Admin(Admin::Open { start: 100, end: 200 })
        );
    }

    #[tokio::test]
    async fn zero_poll_interval_does_not_break_the_display_tick() {
        let mut cfg = EngineConfig::default();
        cfg.chain.poll_interval_ms = 0;
        let mut tick = tokio::time::interval(poll_interval(cfg.chain.poll_interval_ms));
        tick.tick().await;
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args("buy win 0")).is_err());
        assert!(parse_args(&args("buy maybe 1")).is_err());
        assert!(parse_args(&args("admin resolve 3")).is_err());
        assert!(parse_args(&args("")).is_err());
    }
}
