use atomic_counter::AtomicCounter;
use epc::DatagramHandler;
use epc::userplane_counter_indices::*;
use epc_tests::framework::*;

const IMSI: u64 = 7;
const RNTI: u16 = 42;

#[test]
fn release_detaches_and_is_idempotent() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 2)?;
    net.attach(IMSI, 1, RNTI)?;

    net.gnb(1).ue_context_release(RNTI)?;
    net.run()?;
    assert!(net.gnb(1).flow_table().is_empty());
    let ue = net.mme.ue(IMSI).unwrap();
    assert!(!ue.attached);
    assert_eq!(ue.cell_id, 0);

    net.gnb(1).ue_context_release(RNTI)?;
    net.gnb(1).ue_context_release(1000)?;
    net.run()?;

    // Downlink on the old tunnel goes nowhere.
    net.pgw.send_downlink(IMSI, 1, &downlink_packet(b"late"))?;
    net.run()?;
    assert_eq!(net.gnb(1).counters()[DROP_UNKNOWN_TEID].get(), 1);
    Ok(())
}

#[test]
fn reattach_after_release() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 1)?;
    net.attach(IMSI, 1, RNTI)?;
    net.gnb(1).ue_context_release(RNTI)?;
    net.run()?;

    net.attach(IMSI, 2, 9)?;
    assert!(net.mme.ue(IMSI).unwrap().attached);
    assert_eq!(net.pgw.teid(IMSI, 1), Some(2));
    assert_eq!(net.sgw.gnb_for_teid(2), Some(GNB_CELL_2));

    let packet = uplink_packet(b"back again");
    net.gnb(2).recv_from_radio(&packet, 9, 1);
    net.run()?;
    assert_eq!(net.pgw.take_uplink(), vec![(2, packet)]);
    Ok(())
}
