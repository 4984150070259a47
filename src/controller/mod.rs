// CONTROLLER: Input, interaction logic and the frame loop
pub mod camera_controller;
pub mod debug;
pub mod frame_loop;
pub mod input;
pub mod proximity;
pub mod reveal;

pub use camera_controller::CameraController;
pub use frame_loop::{FrameDriver, FrameRenderer, FrameView, SessionEvent, MAX_FRAME_DT};
pub use input::{InputEvent, InputProcessor, InputState, KeyBindings, MouseButton};
pub use proximity::ProximityTrigger;
pub use reveal::{RevealSequencer, RevealState, TriggerRefusal};
