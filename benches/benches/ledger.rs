use covenant_ledger::{CheckpointedToken, TokenLedger, VestingLedger, VotingPowerSource};
use covenant_types::{Address, DAY, TOKEN};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn bench_checkpoint_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_checkpoints");

    let holder = Address::from_bytes([1u8; 20]);
    let other = Address::from_bytes([2u8; 20]);
    let mut token = CheckpointedToken::new("COV");
    token.mint(holder, 1_000_000 * TOKEN).unwrap();
    for block in 1..=10_000u64 {
        token.advance_to(block).unwrap();
        token.transfer(holder, other, TOKEN).unwrap();
    }

    group.bench_function("past_voting_power_10k", |b| {
        b.iter(|| black_box(token.past_voting_power(&holder, black_box(4_321))))
    });

    group.bench_function("transfer_with_checkpoint", |b| {
        b.iter_batched(
            || token.clone(),
            |mut token| {
                token.advance_to(10_001).unwrap();
                token.transfer(holder, other, TOKEN).unwrap();
                black_box(token.balance_of(&other));
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn bench_vesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_vesting");

    let owner = Address::from_bytes([9u8; 20]);
    let pool = Address::from_bytes([8u8; 20]);
    let beneficiary = Address::from_bytes([3u8; 20]);

    group.bench_function("create_and_release_100", |b| {
        b.iter_batched(
            || {
                let mut token = CheckpointedToken::new("COV");
                token.mint(pool, 1_000_000 * TOKEN).unwrap();
                (token, VestingLedger::new(pool, owner))
            },
            |(mut token, mut vesting)| {
                for _ in 0..100 {
                    vesting
                        .create_schedule(owner, beneficiary, 0, 30 * DAY, 365 * DAY, 1_000 * TOKEN, &token)
                        .unwrap();
                }
                let guard = covenant_ledger::TransferGuard::new(owner);
                for index in 0..100 {
                    vesting.release(beneficiary, index, 180 * DAY, &mut token, &guard).unwrap();
                }
                black_box(vesting.locked_balance(&beneficiary, 180 * DAY));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_checkpoint_lookup, bench_vesting);
criterion_main!(benches);
