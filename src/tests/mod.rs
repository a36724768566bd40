mod recovery;
mod utils;
