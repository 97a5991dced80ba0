use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::repository::memory::InMemoryAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::auth::token::{generate_token, hash_token};

fn bench_login(c: &mut Criterion) {
    let repo = Arc::new(InMemoryAuthRepository::default());
    let svc = AuthService::new(repo, AuthConfig::default());

    // pre-create user outside of the benchmark using a tokio runtime
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(svc.register(RegisterInput { email: "bench@example.com".into(), name: "Bench".into(), password: "Benchmark1".into() }))
        .unwrap();

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            let _ = rt.block_on(svc.login(LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() })).unwrap();
        });
    });
}

fn bench_token_generate(c: &mut Criterion) {
    c.bench_function("token_generate_and_hash", |b| {
        b.iter(|| hash_token(&generate_token()));
    });
}

criterion_group!(benches, bench_login, bench_token_generate);
criterion_main!(benches);
