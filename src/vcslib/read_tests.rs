use super::*;

fn request_read(lib: &mut VcsLib, core: &mut TestCore, queue: &mut BusTransactionQueue, address: u32) {
    core.registers[0] = address;
    assert_eq!(
        lib.fetch16(Intrinsic::VcsRead4.address(), core, queue),
        Err(StubError::StopExecution(PauseReason::AwaitingRead))
    );
}

#[test]
fn test_read_round_trip() {
    let (mut lib, mut core, mut queue) = setup();

    request_read(&mut lib, &mut core, &mut queue, 0x00F0);
    assert_eq!(lib.handshake(), ReadHandshake::AwaitingRead(0x00F0));

    let transactions = drain(&mut queue);
    assert_eq!(injected(&transactions), vec![0xAD, 0xF0, 0x00]);
    assert_eq!(transactions[3].kind, TransactionKind::Yield);
    assert_eq!(transactions[3].address, 0x00F0);

    lib.update_bus(0x00F0, 0x7E);
    core.registers[0] = 0xFFFF_FFFF;

    assert_eq!(
        lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue),
        Ok(RETURN)
    );
    assert_eq!(core.registers[0], 0x7E);
    assert_eq!(lib.handshake(), ReadHandshake::Idle);
    assert!(queue.is_empty());
}

#[test]
fn test_read_waits_for_queue_to_drain() {
    let (mut lib, mut core, mut queue) = setup();
    request_read(&mut lib, &mut core, &mut queue, 0x0282);

    // Bus already shows the address, but the load is still queued
    lib.update_bus(0x0282, 0x08);
    for _ in 0..3 {
        assert_eq!(
            lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue),
            Err(StubError::StopExecution(PauseReason::AwaitingRead))
        );
        assert_eq!(queue.len(), 4);
        assert_eq!(lib.handshake(), ReadHandshake::AwaitingRead(0x0282));
    }

    drain(&mut queue);
    assert_eq!(
        lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue),
        Ok(RETURN)
    );
    assert_eq!(core.registers[0], 0x08);
}

#[test]
fn test_read_waits_for_matching_address() {
    let (mut lib, mut core, mut queue) = setup();
    request_read(&mut lib, &mut core, &mut queue, 0x0284);
    drain(&mut queue);

    lib.update_bus(0x1003, 0xAD);
    core.registers[0] = 0x1234;
    for _ in 0..3 {
        assert_eq!(
            lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue),
            Err(StubError::StopExecution(PauseReason::AwaitingRead))
        );
    }
    assert!(queue.is_empty());
    assert_eq!(core.registers[0], 0x1234);
    assert_eq!(lib.handshake(), ReadHandshake::AwaitingRead(0x0284));

    lib.update_bus(0x0284, 0x3C);
    lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue)
        .unwrap();
    assert_eq!(core.registers[0], 0x3C);
}

#[test]
fn test_read_latch_is_most_recent_report() {
    let (mut lib, mut core, mut queue) = setup();
    request_read(&mut lib, &mut core, &mut queue, 0x0080);
    drain(&mut queue);

    lib.update_bus(0x0080, 0x01);
    lib.update_bus(0x1004, 0x02);
    lib.update_bus(0x0080, 0x03);

    lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue)
        .unwrap();
    assert_eq!(core.registers[0], 0x03);
}

#[test]
fn test_read_address_is_sixteen_bits() {
    let (mut lib, mut core, mut queue) = setup();
    request_read(&mut lib, &mut core, &mut queue, 0x0001_0282);

    assert_eq!(lib.handshake(), ReadHandshake::AwaitingRead(0x0282));
    assert_eq!(injected(&drain(&mut queue)), vec![0xAD, 0x82, 0x02]);
}

#[test]
fn test_bus_reports_while_idle_are_harmless() {
    let (mut lib, mut core, mut queue) = setup();
    lib.update_bus(0x00F0, 0x99);
    assert_eq!(lib.handshake(), ReadHandshake::Idle);

    // A fresh request always issues a new load, even if the latch already matches
    request_read(&mut lib, &mut core, &mut queue, 0x00F0);
    assert_eq!(queue.len(), 4);
}

#[test]
fn test_reset_abandons_pending_read() {
    let (mut lib, mut core, mut queue) = setup();
    request_read(&mut lib, &mut core, &mut queue, 0x00F0);
    drain(&mut queue);

    lib.reset();
    assert_eq!(lib.handshake(), ReadHandshake::Idle);

    request_read(&mut lib, &mut core, &mut queue, 0x00F1);
    assert_eq!(lib.handshake(), ReadHandshake::AwaitingRead(0x00F1));
}

#[test]
fn test_read_timestamps_each_dispatch() {
    let (mut lib, mut core, mut queue) = setup();
    core.cycles = 10;
    request_read(&mut lib, &mut core, &mut queue, 0x00F0);
    assert!(queue.iter().all(|t| t.timestamp == 10));

    drain(&mut queue);
    lib.update_bus(0x00F0, 0);
    core.cycles = 25;
    lib.fetch16(Intrinsic::VcsRead4.address(), &mut core, &mut queue)
        .unwrap();
    assert_eq!(queue.timestamp(), 25);
}
