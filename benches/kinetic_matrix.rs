use criterion::{criterion_group, criterion_main, Criterion};
use kinspec::prelude::*;
use std::hint::black_box;

fn three_state_model(global: usize) -> KineticModel {
    KineticModel::new(&["s1", "s2", "s3"])
        .with_k_matrix(
            RateMatrix::new(
                "k1",
                vec![
                    RateMatrixEntry::new("s2", "s1", "kinetic.1"),
                    RateMatrixEntry::new("s3", "s2", "kinetic.2"),
                    RateMatrixEntry::new("s3", "s3", "kinetic.3"),
                ],
            )
            .expect("rate matrix"),
        )
        .with_megacomplex("mc1", &["k1"])
        .with_irf(
            "irf1",
            Irf::Gaussian(
                GaussianIrf::new("irf.center", "irf.width")
                    .with_center_dispersion(500.0, vec!["irf.disp".into()])
                    .with_backsweep("irf.period"),
            ),
        )
        .with_initial_concentration(
            "j1",
            InitialConcentration::new(&[("s1", "j.1"), ("s2", "j.0"), ("s3", "j.0")]),
        )
        .with_dataset(
            "dataset1",
            Dataset {
                megacomplexes: vec!["mc1".into()],
                irf: Some("irf1".into()),
                initial_concentration: Some("j1".into()),
                time: (0..500).map(|i| -1.0 + i as f64 * 0.05).collect(),
                global_axis: (0..global).map(|i| 400.0 + i as f64).collect(),
                ..Default::default()
            },
        )
}

fn parameters() -> Parameters {
    Parameters::new()
        .with("kinetic.1", 2.0)
        .with("kinetic.2", 0.3)
        .with("kinetic.3", 0.01)
        .with("irf.center", 0.1)
        .with("irf.width", 0.05)
        .with("irf.disp", 0.02)
        .with("irf.period", 1300.0)
        .with("j.1", 1.0)
        .with("j.0", 0.0)
}

fn build(c: &mut Criterion) {
    let model = three_state_model(1);
    let builder = KineticMatrixBuilder::new(&model);
    let parameters = parameters();
    c.bench_function("build single index", |b| {
        b.iter(|| black_box(builder.build("dataset1", 400.0, &parameters)))
    });
}

fn build_dataset(c: &mut Criterion) {
    let model = three_state_model(200);
    let builder = KineticMatrixBuilder::new(&model);
    let parameters = parameters();
    c.bench_function("build dataset 200 indices", |b| {
        b.iter(|| {
            black_box(builder.build_dataset("dataset1", &parameters, BuildOptions::new()))
        })
    });
}

criterion_group!(benches, build, build_dataset);
criterion_main!(benches);
