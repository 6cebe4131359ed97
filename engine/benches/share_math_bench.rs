// Share math benchmarks for the SNP vault engine.
//
// Covers the 256-bit mul-div at the heart of every conversion, deposit and
// redemption pricing at different pool sizes, and a full plan/commit
// deposit-withdraw cycle through a vault.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use snp_engine::clock::ManualClock;
use snp_engine::config::SCALE;
use snp_engine::math::{assets_for_shares, fee_for, mul_div_floor, shares_for_deposit};
use snp_engine::transfer::MemoryAssetLedger;
use snp_engine::{Deployment, DeploymentConfig, Principal};

fn bench_mul_div(c: &mut Criterion) {
    c.bench_function("math/mul_div_floor", |b| {
        b.iter(|| mul_div_floor(u128::MAX / 3, 1_000_001_000, 1_000_000_000));
    });
}

fn bench_conversions(c: &mut Criterion) {
    let mut group = c.benchmark_group("math/conversions");
    for pool in [1_000u128, 1_000_000, 1_000_000_000] {
        let assets = pool * SCALE;
        let supply = assets + 1_000;
        group.bench_with_input(BenchmarkId::new("deposit", pool), &pool, |b, _| {
            b.iter(|| shares_for_deposit(100 * SCALE, supply, assets));
        });
        group.bench_with_input(BenchmarkId::new("redeem", pool), &pool, |b, _| {
            b.iter(|| {
                let gross = assets_for_shares(100 * SCALE, supply, assets)?;
                fee_for(gross, 800)
            });
        });
    }
    group.finish();
}

fn bench_vault_cycle(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let ledger = Arc::new(MemoryAssetLedger::new());
    let alice = Principal::from("ST2ALICE");
    ledger.fund(&alice, u128::MAX / 2);
    let deployment = Deployment::from_config(
        DeploymentConfig::three_tier(Principal::from("ST1OWNER")),
        ledger,
        Arc::new(ManualClock::new(1)),
    )
    .expect("deployment");
    let vault = deployment.vault("vault-growth").expect("growth vault").clone();
    runtime
        .block_on(vault.deposit(&alice, 1_000 * SCALE))
        .expect("seed");

    c.bench_function("vault/deposit_withdraw_cycle", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let shares = vault.deposit(&alice, 10 * SCALE).await.expect("deposit");
                vault
                    .withdraw(&alice, shares, 0, u64::MAX)
                    .await
                    .expect("withdraw")
            })
        });
    });
}

criterion_group!(benches, bench_mul_div, bench_conversions, bench_vault_cycle);
criterion_main!(benches);
