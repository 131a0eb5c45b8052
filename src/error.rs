use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open the store")]
    Store,
    #[display("could not read answer from the terminal")]
    Prompt,
    #[display("no target folder given; nothing to do")]
    NoTarget,
    #[display("cataloguing stopped early")]
    Catalogue,
}
