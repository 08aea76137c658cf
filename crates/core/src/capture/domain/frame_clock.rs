/// Paces the prediction loop to the display refresh.
pub trait FrameClock: Send {
    /// Blocks until the next refresh. Returns `false` once the clock has
    /// stopped and no further cycles should run.
    fn wait_next_frame(&mut self) -> bool;
}
