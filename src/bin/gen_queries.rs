//! Writes a random query set.
//!
//! Usage: `gen-queries --nodes <n> --count <c> [--seed <s>] -o <path>`

use std::path::PathBuf;

use shortest_paths_benchmarks::query_set::QuerySet;

const DEFAULT_COUNT: usize = 1000;
const DEFAULT_SEED: u64 = 42;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} --nodes <n> --count <c> [--seed <s>] -o <path>", program);
    std::process::exit(2);
}

fn value<T: std::str::FromStr>(flag: &str, v: Option<&String>) -> Result<T, String> {
    let v = v.ok_or_else(|| format!("{} needs a value", flag))?;
    v.parse()
        .map_err(|_| format!("invalid value '{}' for {}", v, flag))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("gen-queries");
    let mut nodes: Option<u64> = None;
    let mut count = DEFAULT_COUNT;
    let mut seed = DEFAULT_SEED;
    let mut output: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let next = args.get(i + 1);
        let parsed = match flag {
            "--nodes" => value(flag, next).map(|n| nodes = Some(n)),
            "--count" => value(flag, next).map(|c| count = c),
            "--seed" => value(flag, next).map(|s| seed = s),
            "-o" | "--output" => value(flag, next).map(|o| output = Some(o)),
            other => Err(format!("unknown argument '{}'", other)),
        };
        if let Err(msg) = parsed {
            eprintln!("{}", msg);
            usage(program);
        }
        i += 2;
    }

    let (nodes, output) = match (nodes, output) {
        (Some(n), Some(o)) if n > 0 => (n, o),
        _ => usage(program),
    };

    let queries = QuerySet::generate(count, nodes, seed);
    match QuerySet::write(&output, &queries) {
        Ok(set) => log::info!("wrote {} queries to {}", set.len(), output.display()),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
