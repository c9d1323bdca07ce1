pub(crate) mod mocks;
pub(crate) use mocks::{
    EventLog, FailingDecoder, MockFramebuffer, MockPresenter, RecordingBackend, SolidDecoder,
};
