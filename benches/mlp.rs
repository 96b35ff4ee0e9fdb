use criterion::{Criterion, black_box, criterion_group, criterion_main};

use plateau_mlp::{
    ActivationKind, Activations, Dataset, Scratch, Topology, WeightSet, backprop_step,
    forward_into, run_epoch,
};

fn topology() -> Topology {
    Topology::new(128, 64, 10).unwrap()
}

fn mlp_forward_bench(c: &mut Criterion) {
    let weights = WeightSet::init_with_seed(topology(), 0).unwrap();
    let mut acts = Activations::new(topology());
    let input = vec![0.1_f32; topology().n_in];

    c.bench_function("forward_128_64_10", |b| {
        b.iter(|| {
            forward_into(black_box(&input), &weights, ActivationKind::Logistic, &mut acts).unwrap();
            black_box(acts.output());
        })
    });
}

fn mlp_backprop_bench(c: &mut Criterion) {
    let mut weights = WeightSet::init_with_seed(topology(), 0).unwrap();
    let mut scratch = Scratch::new(topology());
    let input = vec![0.1_f32; topology().n_in];
    let mut target = vec![0.0_f32; topology().n_out];
    target[3] = 1.0;

    c.bench_function("backprop_step_128_64_10", |b| {
        b.iter(|| {
            scratch
                .forward(black_box(&input), &weights, ActivationKind::Logistic)
                .unwrap();
            let mse = backprop_step(
                black_box(&input),
                black_box(&target),
                &mut scratch,
                &mut weights,
                1e-3,
                ActivationKind::Logistic,
            )
            .unwrap();
            black_box(mse);
        })
    });
}

fn epoch_bench(c: &mut Criterion) {
    let t = topology();
    let len = 256;
    let inputs = (0..len * t.n_in).map(|i| ((i % 13) as f32) * 0.05).collect();
    let targets = (0..len * t.n_out)
        .map(|i| if i % t.n_out == (i / t.n_out) % t.n_out { 1.0 } else { 0.0 })
        .collect();
    let data = Dataset::from_flat(inputs, targets, t.n_in, t.n_out).unwrap();

    let mut weights = WeightSet::init_with_seed(t, 0).unwrap();
    let mut scratch = Scratch::new(t);

    c.bench_function("run_epoch_256x128_64_10", |b| {
        b.iter(|| {
            let err = run_epoch(&data, &mut weights, 1e-3, ActivationKind::Tanh, &mut scratch)
                .unwrap();
            black_box(err);
        })
    });
}

criterion_group!(benches, mlp_forward_bench, mlp_backprop_bench, epoch_bench);
criterion_main!(benches);
