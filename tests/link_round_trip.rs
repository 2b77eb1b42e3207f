use proptest::prelude::*;

use teleop_link::input::{InputEvent, InputState, Key, Mode};
use teleop_link::protocol::{Channels, Frame, RcPacket, build_rc_packet, verify_checksum};
use teleop_link::transmission::{Latest, ManualClock, TickOutcome, TxScheduler};
use teleop_link::transport::MemoryTransport;

fn decode(bytes: &[u8]) -> RcPacket {
    RcPacket::decode(&Frame::parse(bytes).expect("valid frame")).expect("RC frame")
}

#[test]
fn ticks_send_latest_state_only() {
    let transport = MemoryTransport::new();
    let input = Latest::new(InputState::with_speed_limit(100));
    let clock = ManualClock::new(0);
    let mut scheduler = TxScheduler::new(transport.clone(), input.clone(), clock.clone());

    // 1 s at 20 Hz; the input changes 10 times in between, every 100 ms at +25 ms
    let mut expected = Vec::new();
    let mut state = input.load();
    for t in 1..=20u32 {
        let now = t * 50;
        if t % 2 == 0 {
            clock.set(now - 25);
            let speed = (t as u16) * 10;
            state = state.apply(InputEvent::SpeedLimit(speed));
            state = state.apply(InputEvent::Pressed(Key::ThrottleDown));
            input.store(state);
        }
        clock.set(now);
        assert!(matches!(scheduler.tick(), TickOutcome::Sent { .. }));
        expected.push((input.load().channels(), now));
    }

    let sent = transport.sent();
    assert_eq!(sent.len(), 20);
    for (bytes, (channels, now)) in sent.iter().zip(expected) {
        let packet = decode(bytes);
        assert_eq!(packet.channels, channels);
        assert_eq!(packet.timestamp_ms, now);
    }
    // last tick carries the last of the ten writes
    assert_eq!(decode(&sent[19]).channels.throttle, 1500 + 200);
}

#[test]
fn auto_toggle_is_visible_on_next_tick() {
    let transport = MemoryTransport::new();
    let input = Latest::new(InputState::with_speed_limit(200));
    let mut scheduler = TxScheduler::new(transport.clone(), input.clone(), ManualClock::new(0));

    let auto = input.update(|s| s.apply(InputEvent::Pressed(Key::AutoToggle)));
    assert_eq!(auto.mode(), Mode::Auto);
    scheduler.tick();

    input.update(|s| s.apply(InputEvent::Released(Key::AutoToggle)));
    let manual = input.update(|s| s.apply(InputEvent::Pressed(Key::AutoToggle)));
    assert_eq!(manual.mode(), Mode::Manual);
    scheduler.tick();

    let sent = transport.sent();
    assert_eq!(decode(&sent[0]).channels.throttle, 1300);
    assert_eq!(decode(&sent[0]).channels.aux2, 2000);
    assert_eq!(decode(&sent[1]).channels.throttle, 1500);
    assert_eq!(decode(&sent[1]).channels.aux2, 1000);
}

fn channel() -> impl Strategy<Value = u16> {
    1000u16..=2000
}

proptest! {
    #[test]
    fn rc_frame_round_trips(
        throttle in channel(),
        roll in channel(),
        aux1 in channel(),
        aux2 in channel(),
        timestamp in any::<u32>(),
    ) {
        let channels = Channels { throttle, roll, aux1, aux2 };
        let bytes = build_rc_packet(&channels, timestamp).unwrap();
        let packet = decode(&bytes);
        prop_assert_eq!(packet.channels, channels);
        prop_assert_eq!(packet.timestamp_ms, timestamp);
    }

    #[test]
    fn any_single_bit_flip_in_body_is_detected(
        roll in channel(),
        timestamp in any::<u32>(),
        pick in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let channels = Channels { roll, ..Channels::default() };
        let mut bytes = build_rc_packet(&channels, timestamp).unwrap();
        prop_assert!(verify_checksum(&bytes));

        // body = type byte + records, between the length field and the checksum
        let body_len = bytes[1] as usize;
        let idx = 2 + pick.index(body_len);
        bytes[idx] ^= 1 << bit;
        prop_assert!(!verify_checksum(&bytes));
    }
}
