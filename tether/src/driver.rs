//! The interactive prompt loop.

use std::io;

use tchat::ChatService;
use tcommon::BoxFuture;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tsession::{ServerDetails, ToolDescriptor};

type Interrupt = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    Quit,
    EndOfInput,
    /// Interrupted while waiting at the prompt.
    Interrupted,
    /// A query failed in a way that left the tool session unusable.
    SessionLost,
}

impl DriverExit {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Quit | Self::EndOfInput | Self::Interrupted => 0,
            Self::SessionLost => 1,
        }
    }
}

pub struct InteractiveDriver<R, W> {
    input: R,
    output: W,
    interrupt: Interrupt,
}

impl<R, W> InteractiveDriver<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            interrupt: Box::new(|| Box::pin(std::future::pending::<()>())),
        }
    }

    /// Each call yields a future that resolves when the user asks to interrupt.
    pub fn with_interrupt<F>(mut self, interrupt: F) -> Self
    where
        F: FnMut() -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.interrupt = Box::new(interrupt);
        self
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }

    pub async fn announce(
        &mut self,
        server: &ServerDetails,
        tools: &[ToolDescriptor],
    ) -> io::Result<()> {
        let names = tools
            .iter()
            .map(|tool| tool.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let server_name = if server.info.name.is_empty() {
            "server"
        } else {
            server.info.name.as_str()
        };

        self.write(&format!(
            "\nConnected to {server_name} with tools: [{names}]\n"
        ))
        .await
    }

    /// Reads queries until `quit`, end of input, or a session-fatal error.
    pub async fn run(&mut self, service: &ChatService) -> io::Result<DriverExit> {
        self.write("\nMCP Client Started!\nType your queries or 'quit' to exit.\n")
            .await?;

        let mut line = String::new();
        loop {
            self.write("\nQuery: ").await?;

            line.clear();
            let read = tokio::select! {
                biased;
                read = self.input.read_line(&mut line) => Some(read?),
                () = (self.interrupt)() => None,
            };
            match read {
                None => {
                    self.write("\n").await?;
                    return Ok(DriverExit::Interrupted);
                }
                Some(0) => {
                    self.write("\n").await?;
                    return Ok(DriverExit::EndOfInput);
                }
                Some(_) => {}
            }

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if query.eq_ignore_ascii_case("quit") {
                return Ok(DriverExit::Quit);
            }

            let result = tokio::select! {
                biased;
                result = service.process_query(query) => Some(result),
                () = (self.interrupt)() => None,
            };

            match result {
                Some(Ok(outcome)) => {
                    self.write(&format!("\n{}\n", outcome.text())).await?;
                }
                Some(Err(error)) => {
                    self.write(&format!("\nError: {}\n", error.message)).await?;
                    if error.is_session_fatal() {
                        tracing::warn!(error = %error, "tool session lost");
                        self.write("The tool server connection was lost; exiting.\n")
                            .await?;
                        return Ok(DriverExit::SessionLost);
                    }
                }
                None => {
                    tracing::info!("query cancelled by user");
                    self.write("\nQuery cancelled.\n").await?;
                }
            }
        }
    }

    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await
    }
}
