//! Demo application: several threads build and drop counted objects through
//! factories, then the per-type counters are printed as a table.
//!
//! Run with:
//! ```bash
//! cargo run --example demo --features demo -- --help
//! RUST_LOG=debug cargo run --example demo --features demo -- --threads 4
//! ```

use clap::{Parser, ValueEnum};
use istanze::census::Census;
use istanze::countable;
use istanze::counted::Counted;
use istanze::counters::{registry, state::CounterState, Countable};
use istanze::error::Result;
use istanze::factory::ObjectFactory;
use istanze::observers::table::{TableObserver, TableStyle};
use std::thread;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Sharp,
    Modern,
    Markdown,
    Blank,
}

impl From<StyleChoice> for TableStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => TableStyle::Ascii,
            StyleChoice::Rounded => TableStyle::Rounded,
            StyleChoice::Sharp => TableStyle::Sharp,
            StyleChoice::Modern => TableStyle::Modern,
            StyleChoice::Markdown => TableStyle::Markdown,
            StyleChoice::Blank => TableStyle::Blank,
        }
    }
}

/// Per-type lifecycle counters demo.
#[derive(Debug, Parser)]
#[command(name = "demo", version, about)]
struct Args {
    /// Number of worker threads
    #[arg(short, long, default_value_t = 8)]
    threads: usize,

    /// Objects built (and dropped) by each thread
    #[arg(short, long, default_value_t = 10_000)]
    iterations: usize,

    /// Objects each thread keeps alive until the end
    #[arg(short, long, default_value_t = 5)]
    keep: usize,

    /// Table style
    #[arg(short, long, value_enum, default_value_t = StyleChoice::Rounded)]
    style: StyleChoice,

    /// Build `Token`s (16-bit counters) until their counters overflow
    #[arg(long)]
    overflow: bool,
}

/// A point with up to three coordinates, counted with copy/move tracking.
#[derive(Debug)]
struct Point {
    coords: (i32, i32, i32),
    counted: Counted<Point>,
}

countable!(Point, u64, extended);

impl Point {
    fn new(x: i32, y: i32, z: i32) -> Result<Self> {
        Ok(Point {
            coords: (x, y, z),
            counted: Counted::new()?,
        })
    }

    fn take(&mut self) -> Result<Self> {
        Ok(Point {
            coords: std::mem::take(&mut self.coords),
            counted: Counted::try_move_from(&mut self.counted)?,
        })
    }
}

impl Clone for Point {
    fn clone(&self) -> Self {
        Point {
            coords: self.coords,
            counted: self.counted.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.coords = source.coords;
        self.counted.clone_from(&source.counted);
    }
}

/// A short-lived value with narrow counters.
struct Token {
    _counted: Counted<Token>,
}

countable!(Token, u16);

/// A generic wrapper: each instantiation is counted separately.
struct Labeled<T: 'static> {
    label: T,
    _counted: Counted<Labeled<T>>,
}

impl<T: 'static> Countable for Labeled<T> {
    type Width = u32;

    fn counter_state() -> &'static CounterState<u32> {
        registry::counter_state::<Self, u32>()
    }
}

impl<T: 'static> Labeled<T> {
    fn new(label: T) -> Result<Self> {
        Ok(Labeled {
            label,
            _counted: Counted::new()?,
        })
    }
}

fn worker(id: usize, iterations: usize, keep: usize) -> Result<Vec<Point>> {
    let factory = ObjectFactory::new((id as i32, 1, 2), |(x, y, z)| Point::new(x, y, z));
    let mut kept = Vec::with_capacity(keep);

    for i in 0..iterations {
        let mut point = factory.try_create()?;
        match i % 4 {
            0 => {
                let copy = point.clone();
                point.clone_from(&copy);
            }
            1 => {
                let _moved = point.take()?;
            }
            _ => {}
        }
        if kept.len() < keep {
            kept.push(*point);
        }
    }

    let name = Labeled::new(format!("worker-{id}"))?;
    let index = Labeled::new(id)?;
    debug!(worker = %name.label, index = index.label, kept = kept.len(), "worker finished");
    Ok(kept)
}

fn overflow_tokens() {
    let mut built: u64 = 0;
    loop {
        match Counted::<Token>::new() {
            Ok(counted) => {
                drop(Token { _counted: counted });
                built += 1;
            }
            Err(err) => {
                println!("construction #{} failed: {err}", built + 1);
                break;
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    info!(threads = args.threads, iterations = args.iterations, "demo started");

    let handles: Vec<_> = (0..args.threads)
        .map(|id| {
            let (iterations, keep) = (args.iterations, args.keep);
            thread::spawn(move || worker(id, iterations, keep))
        })
        .collect();

    let mut survivors = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(Ok(points)) => survivors.extend(points),
            Ok(Err(err)) => eprintln!("worker failed: {err}"),
            Err(_) => eprintln!("worker panicked"),
        }
    }

    if args.overflow {
        overflow_tokens();
    }

    let census = Census::new()
        .track_extended::<Point>()
        .track::<Token>()
        .track::<Labeled<String>>()
        .track::<Labeled<usize>>();

    let observer = TableObserver::new()
        .with_style(args.style.into())
        .with_title(format!("{} points still alive", survivors.len()));
    println!("{}", observer.render(census.collect().iter()));

    if let Some(first) = survivors.first() {
        println!("first survivor: {:?}", first.coords);
    }
    drop(survivors);

    println!(
        "{}",
        TableObserver::new()
            .with_style(args.style.into())
            .with_title("after dropping the survivors")
            .render(census.report().iter())
    );

    info!("demo terminated");
}
