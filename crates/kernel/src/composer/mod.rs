//! Composer integration for Bolt extensions.
//!
//! Extensions are Composer packages of type `bolt-extension`. The hooks in
//! [`listener`] keep their public assets mirrored into the web root and
//! record the installed set in `vendor/autoload.json`.

mod descriptor;
mod fs;
mod io;
pub mod listener;
mod package;

pub use descriptor::PackageDescriptor;
pub use fs::{MirrorError, mirror_dir};
pub use io::{BufferedIo, IoSink, TracingIo};
pub use listener::{AUTOLOAD_FILE, dump, handle, mirror};
pub use package::{
    EXTENSION_TYPE, Package, PackageEvent, PackageOperation, RootPackage, ScriptEvent,
};
