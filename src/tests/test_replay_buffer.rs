use crate::error::PilotError;
use crate::replay_buffer::{ReplayBuffer, Transition};
use ndarray::array;

fn transition(tag: f32) -> Transition {
    Transition {
        state: array![tag, -tag],
        action: 0,
        reward: tag,
        next_state: array![tag + 1.0, -tag - 1.0],
    }
}

#[test]
fn test_push_and_sample() {
    let mut buffer = ReplayBuffer::new(10);
    let t = transition(0.5);
    buffer.push(t.clone());
    assert_eq!(buffer.len(), 1);

    let sample = buffer.sample(1).unwrap();
    assert_eq!(sample[0], &t);
}

#[test]
fn test_capacity_evicts_oldest() {
    let mut buffer = ReplayBuffer::new(3);

    for i in 0..5 {
        buffer.push(transition(i as f32));
    }

    // Never exceeds capacity, and the two oldest transitions are gone.
    assert_eq!(buffer.len(), 3);
    let samples = buffer.sample(3).unwrap();
    let tags: Vec<f32> = samples.iter().map(|t| t.state[0]).collect();
    assert!(tags.contains(&2.0));
    assert!(tags.contains(&3.0));
    assert!(tags.contains(&4.0));
    assert!(!tags.contains(&0.0));
    assert!(!tags.contains(&1.0));
}

#[test]
fn test_sample_without_replacement() {
    let mut buffer = ReplayBuffer::new(10);
    for i in 0..5 {
        buffer.push(transition(i as f32));
    }

    let samples = buffer.sample(5).unwrap();
    let mut tags: Vec<f32> = samples.iter().map(|t| t.state[0]).collect();
    tags.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(tags, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_insufficient_data() {
    let mut buffer = ReplayBuffer::new(10);
    buffer.push(transition(1.0));

    match buffer.sample(2) {
        Err(PilotError::InsufficientData { available, requested }) => {
            assert_eq!(available, 1);
            assert_eq!(requested, 2);
        }
        other => panic!("expected InsufficientData, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn test_sampling_after_wraparound() {
    // Past capacity the deque's ring wraps; sampling must still cover every
    // live transition.
    let mut buffer = ReplayBuffer::new(4);
    for i in 0..9 {
        buffer.push(transition(i as f32));
    }

    let samples = buffer.sample(4).unwrap();
    let mut tags: Vec<f32> = samples.iter().map(|t| t.state[0]).collect();
    tags.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(tags, vec![5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn test_is_empty() {
    let mut buffer = ReplayBuffer::new(10);
    assert!(buffer.is_empty());
    buffer.push(transition(0.0));
    assert!(!buffer.is_empty());
}
