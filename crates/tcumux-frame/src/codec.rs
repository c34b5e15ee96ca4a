use crate::error::ProtocolWarning;
use crate::tag::Tag;

/// Escape marker: the next byte is a command, not payload.
pub const ESCAPE: u8 = 0xff;

/// Command byte requesting the other side to resynchronize.
pub const RESET: u8 = 0xfd;

/// The complete reset request as written to the link.
pub const RESET_REQUEST: [u8; 2] = [ESCAPE, RESET];

/// Two-byte sequence selecting `tag` for all following bytes.
///
/// ```text
/// ┌────────────┬────────────┬──────────────────────────┐
/// │ 0xff       │ tag        │ payload ...              │
/// │ escape     │ 0xe0..0xe5 │ (unescaped, until next   │
/// │            │            │  escape)                 │
/// └────────────┴────────────┴──────────────────────────┘
/// ```
pub fn select_prefix(tag: Tag) -> [u8; 2] {
    [ESCAPE, tag.byte()]
}

/// Decoder position between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Bytes are payload for the active console.
    #[default]
    Normal,
    /// An escape was seen; the next byte is a command.
    ExpectingCommand,
}

/// One decoding step over link input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// A contiguous run of payload for `tag`.
    Payload { tag: Tag, bytes: &'a [u8] },
    /// The active console switched to `tag`.
    Select(Tag),
    /// The other side requested a resynchronization. The decoder has already
    /// dropped its active console.
    Reset,
    /// A recoverable anomaly; decoding continues.
    Warning(ProtocolWarning),
}

/// Inbound state machine for the combined UART.
///
/// Only the parser state and the active console survive between reads; a
/// partially received escape sequence is resumed on the next call.
#[derive(Debug, Default)]
pub struct Decoder {
    state: ParserState,
    output: Option<Tag>,
}

impl Decoder {
    /// Create a decoder with no console selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `input`, yielding routing decisions in order.
    ///
    /// The returned iterator must be drained for the decoder state to reflect
    /// all of `input`.
    pub fn feed<'d, 'a>(&'d mut self, input: &'a [u8]) -> Feed<'d, 'a> {
        Feed {
            decoder: self,
            input,
            pos: 0,
        }
    }

    /// Console currently receiving payload, if any.
    pub fn active_output(&self) -> Option<Tag> {
        self.output
    }

    /// Current parser state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Forget the active console and any pending escape.
    pub fn reset(&mut self) {
        self.state = ParserState::Normal;
        self.output = None;
    }

    fn command(&mut self, byte: u8) -> Decoded<'static> {
        self.state = ParserState::Normal;

        if let Some(tag) = Tag::from_byte(byte) {
            self.output = Some(tag);
            return Decoded::Select(tag);
        }

        if byte == RESET {
            self.output = None;
            return Decoded::Reset;
        }

        Decoded::Warning(ProtocolWarning::UnknownCommand(byte))
    }
}

/// Iterator returned by [`Decoder::feed`].
pub struct Feed<'d, 'a> {
    decoder: &'d mut Decoder,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Feed<'_, 'a> {
    type Item = Decoded<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let byte = *self.input.get(self.pos)?;

            if self.decoder.state == ParserState::ExpectingCommand {
                self.pos += 1;
                return Some(self.decoder.command(byte));
            }

            if byte == ESCAPE {
                self.decoder.state = ParserState::ExpectingCommand;
                self.pos += 1;
                continue;
            }

            let start = self.pos;
            let end = self.input[start..]
                .iter()
                .position(|&b| b == ESCAPE)
                .map_or(self.input.len(), |offset| start + offset);
            self.pos = end;
            let run = &self.input[start..end];

            return Some(match self.decoder.output {
                Some(tag) => Decoded::Payload { tag, bytes: run },
                None => Decoded::Warning(ProtocolWarning::Unrouted { len: run.len() }),
            });
        }
    }
}
