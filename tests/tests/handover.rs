use epc::{FlowToBeSwitched, IpVersion, PathSwitchParameters};
use epc_tests::RadioEvent;
use epc_tests::framework::*;
use gtp::{FlowToBeModified, Fteid, InterfaceType};

const IMSI: u64 = 7;
const SOURCE_RNTI: u16 = 42;
const TARGET_RNTI: u16 = 77;

#[test]
fn path_switch_moves_downlink_to_target_cell() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 1)?;
    net.attach(IMSI, 1, SOURCE_RNTI)?;
    net.take_radio_events();

    net.gnb(2).path_switch_request(PathSwitchParameters {
        imsi: IMSI,
        rnti: TARGET_RNTI,
        flows: vec![FlowToBeSwitched { qfi: 1, teid: 1 }],
    })?;
    net.run()?;

    let modified = net.pgw.take_modify_requests();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].imsi, IMSI);
    assert_eq!(modified[0].cell_id, 2);
    assert_eq!(
        modified[0].flows,
        vec![FlowToBeModified {
            qfi: 1,
            fteid: Fteid::new(InterfaceType::S5SgwGtpu, SGW_S5, 1)
        }]
    );
    assert_eq!(net.sgw.gnb_for_teid(1), Some(GNB_CELL_2));
    assert_eq!(
        net.take_radio_events(),
        vec![RadioEvent::PathSwitchAcknowledged {
            cell_id: 2,
            rnti: TARGET_RNTI
        }]
    );
    let ue = net.mme.ue(IMSI).unwrap();
    assert_eq!((ue.cell_id, ue.gnb_ue_s1ap_id), (2, TARGET_RNTI));

    // The source gNB lets go of the UE.  The MME knows it has moved on.
    net.gnb(1).ue_context_release(SOURCE_RNTI)?;
    net.run()?;
    assert!(net.gnb(1).flow_table().is_empty());
    assert!(net.mme.ue(IMSI).unwrap().attached);

    let packet = downlink_packet(b"after handover");
    net.pgw.send_downlink(IMSI, 1, &packet)?;
    net.gnb(2).recv_from_radio(&uplink_packet(b"up"), TARGET_RNTI, 1);
    net.run()?;
    assert_eq!(
        net.take_radio_events(),
        vec![RadioEvent::Packet {
            cell_id: 2,
            rnti: TARGET_RNTI,
            qfi: 1,
            ip_version: IpVersion::V4,
            packet
        }]
    );
    assert_eq!(net.pgw.take_uplink(), vec![(1, uplink_packet(b"up"))]);
    Ok(())
}

#[test]
fn path_switch_for_unknown_tunnel_fails() -> anyhow::Result<()> {
    let mut net = Network::new();
    net.provision(IMSI, 1)?;
    net.attach(IMSI, 1, SOURCE_RNTI)?;

    net.gnb(2).path_switch_request(PathSwitchParameters {
        imsi: IMSI,
        rnti: TARGET_RNTI,
        flows: vec![FlowToBeSwitched { qfi: 1, teid: 99 }],
    })?;
    assert!(net.run().is_err());
    Ok(())
}
