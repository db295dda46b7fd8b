use skein_api::payload::{with_position, Payload};
use skein_api::types::Values;
use skein_api::values;

// Payload that remembers how often it ran
#[derive(Default)]
struct Counter {
    position: Option<usize>,
    calls: u64,
}

impl Payload for Counter {
    fn init(&mut self, position: Option<usize>) {
        self.position = position;
    }

    fn call(&mut self, _args: Values) -> Values {
        self.calls += 1;
        values![self.calls, self.position]
    }
}

#[test]
fn test_struct_payload_keeps_state() {
    let mut counter = Counter::default();
    counter.init(Some(2));

    assert_eq!(counter.call(values![]), values![1, 2]);
    assert_eq!(counter.call(values![]), values![2, 2]);
}

#[test]
fn test_closure_payload() {
    let mut add = |args: Values| {
        let sum: i64 = args.iter().filter_map(|v| v.as_i64()).sum();
        values![sum]
    };

    // Default init is a no-op
    Payload::init(&mut add, Some(1));
    assert_eq!(Payload::call(&mut add, values![2, 3]), values![5]);
}

#[test]
fn test_positioned_payload_standalone() {
    let mut payload = with_position(|position: Option<usize>, args: Values| {
        values![position.is_none(), args.len()]
    });
    payload.init(None);

    assert_eq!(payload.call(values![1, 2, 3]), values![true, 3]);
}

#[test]
fn test_positioned_payload_is_clonable_template() {
    let template = with_position(|position: Option<usize>, _args: Values| values![position]);

    let mut first = template.clone();
    let mut second = template;
    first.init(Some(1));
    second.init(Some(2));

    assert_eq!(first.call(values![]), values![1]);
    assert_eq!(second.call(values![]), values![2]);
}
