use epc::FlowId;
use epc_tests::framework::*;
use gtp::Cause;

const IMSI: u64 = 7;
const RNTI: u16 = 42;

#[test]
fn gnb_initiated_release_of_attached_ue() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 2)?;
    net.attach(IMSI, 1, RNTI)?;

    net.gnb(1).release_indication(IMSI, RNTI, 2)?;
    net.run()?;

    let responses = net.pgw.take_delete_responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].cause, Cause::RequestAccepted);
    assert_eq!(responses[0].qfis, vec![2]);
    assert_eq!(net.pgw.teid(IMSI, 2), None);
    assert_eq!(net.sgw.gnb_for_teid(2), None);
    assert_eq!(net.sgw.gnb_for_teid(1), Some(GNB_CELL_1));

    // The tunnel is gone but the MME keeps the flow for the next attach.
    let flows = net.gnb(1).flow_table();
    assert_eq!(flows.teid(FlowId { rnti: RNTI, qfi: 2 }), None);
    assert_eq!(flows.teid(FlowId { rnti: RNTI, qfi: 1 }), Some(1));
    assert!(net.mme.ue(IMSI).unwrap().flow(2).is_some());
    Ok(())
}

#[test]
fn network_initiated_release_of_detached_ue() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 2)?;
    net.attach(IMSI, 1, RNTI)?;
    net.gnb(1).ue_context_release(RNTI)?;
    net.run()?;
    assert!(!net.mme.ue(IMSI).unwrap().attached);

    net.pgw.delete_flows(IMSI, vec![1])?;
    net.run()?;
    assert_eq!(net.pgw.take_delete_responses()[0].qfis, vec![1]);
    assert_eq!(net.sgw.gnb_for_teid(1), None);

    // Deprovisioned, so the next attach only brings up flow 2.
    let ue = net.mme.ue(IMSI).unwrap();
    assert!(ue.flow(1).is_none());
    assert!(ue.flow(2).is_some());
    net.attach(IMSI, 1, RNTI)?;
    assert_eq!(net.gnb(1).flow_table().len(), 1);
    assert_eq!(net.pgw.teid(IMSI, 2), Some(3));
    Ok(())
}
