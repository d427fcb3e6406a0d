/// A marker type indicating that a model is **not yet trained**.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Unfitted;

/// A marker type indicating that a model holds learned parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Fitted;
