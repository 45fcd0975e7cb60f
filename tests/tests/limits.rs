use epc::MAX_FLOWS_PER_UE;
use epc_tests::framework::*;
use gtp::{QosFlow, QosRule};

#[test]
fn sixty_fifth_flow_is_refused() -> anyhow::Result<()> {
    let mut net = Network::new();
    let qfis = net.provision(7, MAX_FLOWS_PER_UE)?;
    assert_eq!(qfis.first(), Some(&1));
    assert_eq!(qfis.last(), Some(&64));
    assert!(
        net.mme
            .add_flow(7, QosRule::new(255, 0), QosFlow::non_gbr(9))
            .is_err()
    );

    // A full UE still attaches with all of its flows.
    net.attach(7, 1, 42)?;
    assert_eq!(net.gnb(1).flow_table().len(), MAX_FLOWS_PER_UE);
    Ok(())
}

#[test]
fn imsis_that_share_a_teid_are_refused() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(7, 1)?;
    assert!(net.provision(7 + (1 << 32), 1).is_err());
    Ok(())
}
