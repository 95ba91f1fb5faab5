mod interval;

pub use interval::{
    ChannelListener, IntervalTimer, TimerConfig, TimerEvent, TimerEventKind, TimerListener,
    DEFAULT_PERIOD_MS,
};
