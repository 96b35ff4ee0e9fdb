//! Train on a small synthetic problem and answer plateau prompts from stdin.
//!
//! ```text
//! RUST_LOG=plateau_mlp=info cargo run --example plateau_console -- --epochs 5000 --lr 0.3
//! ```
//!
//! At each plateau type `c` (continue), `r` (reduce rate) or `s` (stop).

use std::io::{self, BufRead, Write};

use plateau_mlp::{
    ActivationKind, Dataset, TrainConfig, TrainingDecision, TrainingEvent, TrainingSession,
    Topology, evaluate,
};
use tracing_subscriber::EnvFilter;

fn parse_arg<T: std::str::FromStr>(args: &[String], key: &str, default: T) -> T {
    let mut i = 0;
    while i + 1 < args.len() {
        if args[i] == key {
            return args[i + 1]
                .parse::<T>()
                .unwrap_or_else(|_| panic!("failed to parse {key}"));
        }
        i += 1;
    }
    default
}

/// Points on two concentric rings, labelled one-hot by ring.
fn rings(n_per_class: usize) -> plateau_mlp::Result<Dataset> {
    let mut data = Dataset::empty(2, 2)?;
    for i in 0..n_per_class {
        let theta = i as f32 / n_per_class as f32 * std::f32::consts::TAU;
        let (s, c) = theta.sin_cos();
        data.push(&[0.3 * c, 0.3 * s], &[1.0, 0.0])?;
        data.push(&[0.9 * c, 0.9 * s], &[0.0, 1.0])?;
    }
    Ok(data)
}

fn ask(epoch: usize, mean_error: f32) -> TrainingDecision {
    let stdin = io::stdin();
    loop {
        print!("plateau at epoch {epoch} (error {mean_error:.6}) [c]ontinue / [r]educe rate / [s]top: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return TrainingDecision::Stop,
            Ok(_) => {}
        }
        match line.trim() {
            "c" | "continue" => return TrainingDecision::Continue,
            "r" | "reduce" => return TrainingDecision::ReduceRate,
            "s" | "stop" => return TrainingDecision::Stop,
            other => println!("unknown answer {other:?}"),
        }
    }
}

fn main() -> plateau_mlp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let epochs = parse_arg(&args, "--epochs", 5_000usize);
    let hidden = parse_arg(&args, "--hidden", 8usize);
    let lr = parse_arg(&args, "--lr", 0.3f32);
    let window = parse_arg(&args, "--window", 10usize);
    let threshold = parse_arg(&args, "--threshold", 1e-5f32);
    let activation = parse_arg(&args, "--activation", ActivationKind::Tanh);
    let seed = parse_arg(&args, "--seed", 0u64);
    let every = parse_arg(&args, "--print-every", 100usize).max(1);

    let config = TrainConfig::new(Topology::new(2, hidden, 2)?)
        .learning_rate(lr)
        .max_epochs(epochs)
        .activation(activation)
        .target_error(1e-3)
        .plateau(window, threshold)
        .seed(seed);

    let data = rings(32)?;
    let handle = TrainingSession::spawn(config, data.clone())?;

    while let Some(event) = handle.recv() {
        match event {
            TrainingEvent::Progress { epoch, mean_error } => {
                if epoch % every == 0 {
                    println!("epoch {epoch:>6}  error {mean_error:.6}");
                }
            }
            TrainingEvent::Plateau { epoch, mean_error } => {
                handle.decide(ask(epoch, mean_error))?;
            }
            TrainingEvent::Completed(_) | TrainingEvent::Failed(_) => break,
        }
    }

    let outcome = handle.join()?;
    let report = evaluate(&data, &outcome.weights, activation)?;
    println!(
        "stopped: {:?} after {} epochs (lr {:.4}), error {:.6}, accuracy {:.1}%",
        outcome.reason,
        outcome.epochs(),
        outcome.learning_rate,
        report.mean_error,
        report.accuracy * 100.0
    );
    Ok(())
}
