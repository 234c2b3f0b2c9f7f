pub mod credential;
pub mod fallback;
pub mod layout;
pub mod naming;
pub mod ocr;
pub mod packager;
pub mod pipeline;
pub mod proxy;
pub mod renderer;
pub mod synthetic;
