/// The byte stream a [`Connection`](crate::Connection) runs over.
///
/// Only the outbound half lives here. Inbound bytes, end of stream and I/O failures are reported
/// by calling [`Connection::receive`](crate::Connection::receive),
/// [`Connection::on_transport_closed`](crate::Connection::on_transport_closed) and
/// [`Connection::on_transport_error`](crate::Connection::on_transport_error).
pub trait Transport {
    /// The error reported by [`open`](Transport::open) and [`write`](Transport::write).
    type Error;

    /// Establishes the underlying stream.
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Hands a fully built frame (or the upgrade request) to the stream.
    ///
    /// Returning `Ok` completes the write from the connection's point of view.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Tears the stream down.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn open(&mut self) -> Result<(), Self::Error> {
        T::open(self)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        T::write(self, bytes)
    }

    fn close(&mut self) {
        T::close(self)
    }
}
