use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;

use sourcequery::master::ServerList;
use sourcequery::{
    Filter, MasterServer, Player, Region, Rule, ServerInfo, SourceServer, SteamID, Universe,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Timeout for each network step, in milliseconds
    #[clap(short, long, default_value = "5000")]
    timeout_ms: u64,
    /// Print results as JSON
    #[clap(long)]
    json: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query a game server for its info, and optionally its rules and players
    Query {
        /// Server address, e.g. 127.0.0.1:27015
        host: String,
        #[clap(long)]
        ping: bool,
        #[clap(long)]
        rules: bool,
        #[clap(long)]
        players: bool,
    },
    /// List game servers known to the master server
    Master {
        /// us-east, us-west, south-america, europe, asia, australia, middle-east,
        /// africa or world
        #[clap(long, value_parser = parse_region, default_value = "world")]
        region: Region,
        /// Master server address; resolved from the Steam default when omitted
        #[clap(long)]
        master: Option<SocketAddr>,
        /// Stop after this many servers
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long)]
        app_id: Option<u32>,
        #[clap(long)]
        game_dir: Option<String>,
        #[clap(long)]
        map: Option<String>,
        #[clap(long)]
        dedicated: bool,
        #[clap(long)]
        secure: bool,
        #[clap(long)]
        not_empty: bool,
        #[clap(long)]
        not_full: bool,
    },
    /// Convert a Steam ID between its text and numeric forms
    Steamid {
        /// Steam2, Steam3 or 64-bit ID
        text: String,
        /// Use the strict Steam3 grammar
        #[clap(long)]
        strict: bool,
        /// Universe assumed when the text carries none
        #[clap(long, default_value = "1")]
        universe: u8,
    },
}

fn parse_region(s: &str) -> Result<Region, String> {
    match s.to_ascii_lowercase().as_str() {
        "us-east" => Ok(Region::UsEast),
        "us-west" => Ok(Region::UsWest),
        "south-america" => Ok(Region::SouthAmerica),
        "europe" => Ok(Region::Europe),
        "asia" => Ok(Region::Asia),
        "australia" => Ok(Region::Australia),
        "middle-east" => Ok(Region::MiddleEast),
        "africa" => Ok(Region::Africa),
        "world" => Ok(Region::World),
        other => Err(format!("unknown region `{}`", other)),
    }
}

#[derive(Serialize, Debug)]
struct QueryReport {
    address: SocketAddr,
    ping_ms: Option<f64>,
    info: ServerInfo,
    rules: Option<Vec<Rule>>,
    players: Option<Vec<Player>>,
}

#[derive(Serialize, Debug)]
struct SteamIdReport {
    steam64: u64,
    steam2: Option<String>,
    steam3: String,
    valid: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let timeout_dur: Duration = Duration::from_millis(args.timeout_ms);

    match args.command {
        Command::Query {
            host,
            ping,
            rules,
            players,
        } => {
            let server: SourceServer = SourceServer::connect(&host, Some(timeout_dur)).await?;
            info!("querying {}", server.addr());

            let ping_ms: Option<f64> = match ping {
                true => Some(server.ping().await?.as_secs_f64() * 1000.0),
                false => None,
            };
            let report = QueryReport {
                address: server.addr(),
                ping_ms,
                info: server.info().await?,
                rules: if rules { Some(server.rules().await?) } else { None },
                players: if players { Some(server.players().await?) } else { None },
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_query(&report);
            }
        }
        Command::Master {
            region,
            master,
            limit,
            app_id,
            game_dir,
            map,
            dedicated,
            secure,
            not_empty,
            not_full,
        } => {
            let mut filter = Filter::new();
            filter.app_id = app_id;
            filter.game_dir = game_dir;
            filter.map = map;
            filter.dedicated_only = dedicated;
            filter.secure_only = secure;
            filter.not_empty = not_empty;
            filter.not_full = not_full;

            let master: MasterServer = match master {
                Some(addr) => MasterServer::connect_addr(addr, Some(timeout_dur)).await?,
                None => MasterServer::list(Some(timeout_dur))
                    .await?
                    .into_iter()
                    .next()
                    .ok_or("master server did not resolve")?,
            };
            info!("listing servers from {} with filter `{}`", master.addr(), filter);

            let limit: usize = limit.unwrap_or(usize::MAX);
            let mut servers: Vec<SocketAddrV4> = Vec::new();
            let mut pages: ServerList<'_> = master.pages(region, &filter);
            while servers.len() < limit {
                match pages.next_page().await {
                    Ok(Some(page)) => servers.extend(page.servers),
                    Ok(None) => break,
                    Err(e) if !servers.is_empty() => {
                        warn!("listing stopped early: {}", e);
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            servers.truncate(limit);

            if args.json {
                let addrs: Vec<String> = servers.iter().map(|s| s.to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&addrs)?);
            } else {
                for server in &servers {
                    println!("{}", server);
                }
            }
        }
        Command::Steamid {
            text,
            strict,
            universe,
        } => {
            let universe: Universe = Universe::from_raw(universe)
                .filter(|u| *u != Universe::Invalid)
                .ok_or("universe must be between 1 and 4")?;

            let id: SteamID = if text.starts_with("STEAM_") {
                SteamID::from_steam2(&text, universe)?
            } else {
                SteamID::parse_text(&text, universe, strict)?
            };
            let report = SteamIdReport {
                steam64: id.into(),
                steam2: id.render_steam2(),
                steam3: id.render_steam3(),
                valid: id.is_valid(),
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("steam64: {}", report.steam64);
                if let Some(steam2) = &report.steam2 {
                    println!("steam2:  {}", steam2);
                }
                println!("steam3:  {}", report.steam3);
                println!("valid:   {}", report.valid);
            }
        }
    }

    Ok(())
}

fn print_query(report: &QueryReport) {
    let info: &ServerInfo = &report.info;
    println!("{} ({})", info.hostname, report.address);
    if let Some(ping_ms) = report.ping_ms {
        println!("ping: {:.1} ms", ping_ms);
    }
    println!("game: {} [{}], app {}", info.game, info.folder, info.app_id);
    println!("map: {}", info.map);
    println!("players: {}/{} ({} bots)", info.players, info.maxplayers, info.bots);
    println!(
        "version: {}, vac: {}, password: {}",
        info.version, info.vac_enabled, info.password_protected
    );
    if let Some(keywords) = &info.keywords {
        println!("keywords: {}", keywords);
    }

    if let Some(rules) = &report.rules {
        println!("\n{} rules", rules.len());
        for rule in rules {
            println!("  {} = {}", rule.name, rule.value);
        }
    }
    if let Some(players) = &report.players {
        println!("\n{} players", players.len());
        for player in players {
            println!("  {:<32} {:>6} {:>8.0}s", player.name, player.score, player.duration);
        }
    }
}
