use atomic_counter::AtomicCounter;
use epc::userplane_counter_indices::*;
use epc::{DatagramHandler, IpVersion};
use epc_tests::RadioEvent;
use epc_tests::framework::*;
use gtp::{Direction, PacketFilter, QosFlow, QosRule};

const IMSI: u64 = 7;
const RNTI: u16 = 42;

#[test]
fn attach_and_pass_data() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 1)?;

    // Attach.  The SGW's first TEID is 1 and the gNB tunnels with the same TEID.
    net.attach(IMSI, 1, RNTI)?;
    assert_eq!(net.pgw.teid(IMSI, 1), Some(1));
    assert_eq!(net.sgw.gnb_for_teid(1), Some(GNB_CELL_1));
    assert_eq!(
        net.take_radio_events(),
        vec![
            RadioEvent::BearerSetup {
                cell_id: 1,
                rnti: RNTI,
                qfi: 1,
                teid: 1
            },
            RadioEvent::InitialContextSetup {
                cell_id: 1,
                rnti: RNTI
            }
        ]
    );
    let ue = net.mme.ue(IMSI).unwrap();
    assert!(ue.attached);
    assert_eq!(ue.cell_id, 1);
    assert_eq!(ue.gnb_ue_s1ap_id, RNTI);

    // Uplink
    let packet = uplink_packet(b"hello");
    net.gnb(1).recv_from_radio(&packet, RNTI, 1);
    net.run()?;
    assert_eq!(net.pgw.take_uplink(), vec![(1, packet)]);

    // Downlink
    let packet = downlink_packet(b"world");
    net.pgw.send_downlink(IMSI, 1, &packet)?;
    net.run()?;
    assert_eq!(
        net.take_radio_events(),
        vec![RadioEvent::Packet {
            cell_id: 1,
            rnti: RNTI,
            qfi: 1,
            ip_version: IpVersion::V4,
            packet
        }]
    );

    let counters = net.sgw.counters();
    assert_eq!(counters[RX_PKTS].get(), 2);
    assert_eq!(counters[TX_PKTS].get(), 2);
    Ok(())
}

#[test]
fn two_ues_get_distinct_tunnels() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(7, 3)?;
    net.provision(8, 2)?;
    net.attach(7, 1, 42)?;
    net.attach(8, 2, 42)?;

    let mut teids = vec![];
    for (imsi, qfi) in [(7, 1), (7, 2), (7, 3), (8, 1), (8, 2)] {
        teids.push(net.pgw.teid(imsi, qfi).unwrap());
    }
    assert_eq!(teids, vec![1, 2, 3, 4, 5]);
    assert_eq!(net.sgw.gnb_for_teid(3), Some(GNB_CELL_1));
    assert_eq!(net.sgw.gnb_for_teid(4), Some(GNB_CELL_2));
    assert_eq!(net.gnb(1).flow_table().len(), 3);
    assert_eq!(net.gnb(2).flow_table().len(), 2);
    net.take_radio_events();

    // Same RNTI in different cells is a different UE.
    net.pgw.send_downlink(8, 2, &downlink_packet(b"8"))?;
    net.pgw.send_downlink(7, 2, &downlink_packet(b"7"))?;
    net.run()?;
    let delivered: Vec<_> = net
        .take_radio_events()
        .into_iter()
        .map(|e| match e {
            RadioEvent::Packet { cell_id, qfi, .. } => (cell_id, qfi),
            e => panic!("Unexpected {e:?}"),
        })
        .collect();
    assert_eq!(delivered, vec![(2, 2), (1, 2)]);
    Ok(())
}

#[test]
fn downlink_is_classified_by_qos_rule() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.mme.add_ue(IMSI)?;
    let mut web = QosRule::new(10, 0);
    web.add(PacketFilter {
        direction: Direction::Downlink,
        remote_port_start: 80,
        remote_port_end: 80,
        ..Default::default()
    })?;
    let mut default = QosRule::new(255, 0);
    default.add(PacketFilter::default())?;
    assert_eq!(net.mme.add_flow(IMSI, default, QosFlow::non_gbr(9))?, 1);
    assert_eq!(net.mme.add_flow(IMSI, web, QosFlow::non_gbr(6))?, 2);
    net.attach(IMSI, 1, RNTI)?;
    net.take_radio_events();

    assert_eq!(
        net.pgw
            .send_downlink_classified(IMSI, &downlink_packet_from_port(80, b"web"))?,
        2
    );
    assert_eq!(
        net.pgw
            .send_downlink_classified(IMSI, &downlink_packet_from_port(5000, b"other"))?,
        1
    );
    net.run()?;
    let qfis: Vec<u8> = net
        .take_radio_events()
        .into_iter()
        .map(|e| match e {
            RadioEvent::Packet { qfi, .. } => qfi,
            e => panic!("Unexpected {e:?}"),
        })
        .collect();
    assert_eq!(qfis, vec![2, 1]);
    Ok(())
}

#[test]
fn flow_without_radio_bearer_gets_no_tunnel() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 2)?;
    net.wire().fail_bearer(1, 2);
    net.attach(IMSI, 1, RNTI)?;

    // The core still set up both flows.
    assert_eq!(net.pgw.teid(IMSI, 2), Some(2));
    assert_eq!(net.gnb(1).flow_table().len(), 1);

    net.gnb(1).recv_from_radio(&uplink_packet(b"x"), RNTI, 2);
    net.run()?;
    assert!(net.pgw.take_uplink().is_empty());
    assert_eq!(net.gnb(1).counters()[DROP_UNKNOWN_FLOW].get(), 1);

    net.pgw.send_downlink(IMSI, 2, &downlink_packet(b"y"))?;
    net.run()?;
    assert_eq!(net.gnb(1).counters()[DROP_UNKNOWN_TEID].get(), 1);
    Ok(())
}

#[test]
fn attach_of_unknown_ue_fails() {
    let mut net = Network::new();
    assert!(net.attach(IMSI, 1, RNTI).is_err());
}
