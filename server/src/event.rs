pub enum ServerEvent {
    /// One line read from stdin; expected to hold a JSON-RPC message.
    Message(String),
    /// stdin reached EOF (the client went away) or failed.
    InputClosed,
    /// Ctrl+C or SIGTERM received; the server should clean up and exit.
    Shutdown,
}
