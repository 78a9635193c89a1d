use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasherDefault;

use clap::Parser;
use probe_hash::HashTable;
use probe_hash::policy::SetPolicy;

type Table = HashTable<SetPolicy<u64>, BuildHasherDefault<DefaultHasher>>;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Number of erase-then-insert rounds run after the initial fill.
    #[arg(short = 'r', long = "churn_rounds", default_value_t = 0)]
    churn_rounds: usize,

    /// Percentage of entries erased (and replaced) in each churn round.
    #[arg(short = 'e', long = "erase_percent", default_value_t = 50)]
    erase_percent: usize,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table = Table::with_capacity(args.target_capacity);

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table to its maximum load with u64 values...");

    let num_values = table.capacity() - table.capacity() / 8;
    let mut next_value = 0u64;
    let mut num_failures = 0;
    for _ in 0..num_values {
        match table.try_insert(next_value) {
            Ok((_, true)) => {}
            Ok((_, false)) => panic!("Value already exists in table: {}", next_value),
            Err(_) => num_failures += 1,
        }
        next_value += 1;
    }

    println!("Inserted {} values into table", table.len());
    println!("Final load factor: {:.2}%", table.load_factor() * 100.0);

    let erase_per_round = num_values * args.erase_percent.min(100) / 100;
    let mut oldest = 0u64;
    for _ in 0..args.churn_rounds {
        for _ in 0..erase_per_round {
            table.erase(&oldest);
            oldest += 1;
        }
        for _ in 0..erase_per_round {
            table.insert(next_value);
            next_value += 1;
        }
    }
    if args.churn_rounds > 0 {
        println!(
            "After {} churn rounds of {} values: capacity {}, len {}",
            args.churn_rounds,
            erase_per_round,
            table.capacity(),
            table.len()
        );
    }

    table.probe_histogram().print();
    table.debug_stats().print();
    println!(
        "Number of failed try_insert attempts: {} ({:.02}%)",
        num_failures,
        num_failures as f64 / num_values.max(1) as f64 * 100.0
    );
}
