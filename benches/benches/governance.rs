use covenant_governance::{
    integer_sqrt, Dao, DaoIdentities, GovernanceParams, ProposalState, VoteSupport,
};
use covenant_types::{Address, BlockContext, DAY, TOKEN};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

fn bench_integer_sqrt(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic_weight");
    group.throughput(Throughput::Elements(1));

    group.bench_function("isqrt_small", |b| b.iter(|| integer_sqrt(black_box(1_000_000))));
    group.bench_function("isqrt_token_scale", |b| {
        b.iter(|| integer_sqrt(black_box(123_456_789 * TOKEN)))
    });
    group.bench_function("isqrt_max", |b| b.iter(|| integer_sqrt(black_box(u128::MAX))));

    group.finish();
}

fn voter(i: u32) -> Address {
    Address::from_label(&format!("voter-{i}"))
}

fn dao_with_voters(voters: u32) -> Dao {
    let identities = DaoIdentities {
        owner: Address::from_label("owner"),
        governance: Address::from_label("governance"),
        treasury: Address::from_label("treasury"),
        vesting_pool: Address::from_label("vesting"),
        staking_sink: None,
    };
    let params = GovernanceParams {
        proposal_threshold: TOKEN,
        voting_period: 10,
        timelock_duration: DAY,
    };
    let approvers = vec![Address::from_label("approver")];
    let mut dao = Dao::new(identities, params, approvers, "COV", BlockContext::new(1, 0)).unwrap();

    let owner = Address::from_label("owner");
    dao.mint(owner, Address::from_label("treasury"), 1_000 * TOKEN).unwrap();
    for i in 0..voters {
        dao.mint(owner, voter(i), (i as u128 + 1) * TOKEN).unwrap();
    }
    dao.advance(1, 12).unwrap();
    dao
}

fn bench_proposal_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("proposal_lifecycle");
    let base = dao_with_voters(100);

    group.bench_function("vote_100_and_tally", |b| {
        b.iter_batched(
            || base.clone(),
            |mut dao| {
                let recipient = Address::from_label("recipient");
                let pid = dao.propose_fund_request(recipient, 10 * TOKEN, recipient, "bench").unwrap();
                dao.advance(1, 12).unwrap();
                for i in 0..100 {
                    let support = if i % 3 == 0 { VoteSupport::Against } else { VoteSupport::For };
                    dao.vote(voter(i), pid, support).unwrap();
                }
                dao.advance(10, 120).unwrap();
                let state = dao.execute_proposal(recipient, pid).unwrap();
                black_box(state == ProposalState::Queued);
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_integer_sqrt, bench_proposal_lifecycle);
criterion_main!(benches);
