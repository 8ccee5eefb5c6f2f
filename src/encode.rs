//! A module for all encoding needs.
use crate::bits::BitWriter;
use crate::decode::AllResult;
use crate::width::{CodeSize, Growth};
use crate::{Code, Header, LzwError, Stats, END_CODE, FIRST_CODE};

use std::io::{self, BufRead, Write};

/// The state for encoding data with an LZW algorithm.
///
/// The encoder only holds the configuration of the streams it produces. Every stream starts with
/// a fresh dictionary, so the same encoder can be used for any number of independent streams.
pub struct Encoder {
    header: Header,
    stats: Stats,
}

/// A encoding stream sink.
///
/// See [`Encoder::into_stream`] on how to create this type and more information.
///
/// [`Encoder::into_stream`]: struct.Encoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

/// An async encoding sink.
///
/// See [`Encoder::into_async`] on how to create this type and more information.
///
/// [`Encoder::into_async`]: struct.Encoder.html#method.into_async
#[cfg(feature = "async")]
pub struct IntoAsync<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

struct EncodeState {
    header: Header,
    /// The code size state, shared in behaviour with the decoder.
    size: CodeSize,
    /// The current encoding symbol tree.
    tree: Tree,
    /// The node of the longest dictionary string read so far, `ROOT` before any input.
    current: Node,
    /// The code for the next dictionary entry.
    next_code: Code,
    /// If running out of codes has been logged.
    saturated: bool,
    stats: Stats,
}

/// Index of a node in the prefix tree.
///
/// Nodes `0..256` are the single bytes and carry their byte value as code. Node 256, the slot of
/// the end code, is the empty string.
type Node = u32;

const ROOT: Node = END_CODE;
const NO_NODE: Node = Node::MAX;
const NO_CODE: Code = Code::MAX;

/// One tree node for each dictionary string, plus the prefixes of strings that were inserted
/// without them.
/// To avoid using too much memory we keep nodes with few successors in optimized form. This form
/// doesn't offer lookup by indexing but instead does a linear search.
#[derive(Default)]
struct Tree {
    simples: Vec<Simple>,
    complex: Vec<Full>,
    keys: Vec<FullKey>,
    /// The code of the string ending in each node, `NO_CODE` if it is only a prefix.
    codes: Vec<Code>,
    /// The parent and last byte of each node.
    parents: Vec<(Node, u8)>,
}

#[derive(Clone, Copy)]
enum FullKey {
    NoSuccessor,
    Simple(u32),
    Full(u32),
}

const SHORT: usize = 16;

#[derive(Clone, Copy)]
struct Simple {
    nodes: [Node; SHORT],
    chars: [u8; SHORT],
    count: u8,
}

#[derive(Clone, Copy)]
struct Full {
    char_continuation: [Node; 256],
}

impl Encoder {
    /// Create a new encoder for streams with the given header.
    pub fn new(header: Header) -> Self {
        Encoder {
            header,
            stats: Stats::default(),
        }
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Counters of the last stream encoded.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Encode a complete stream from a slice.
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>, LzwError> {
        let mut bits = BitWriter::new(Vec::with_capacity(data.len() / 2 + 8));
        let mut state = EncodeState::new(self.header);
        let result = state
            .start(&mut bits)
            .and_then(|()| state.push(data, &mut bits))
            .and_then(|()| state.finish(&mut bits))
            .and_then(|()| bits.close());
        self.stats = state.stats;
        result?;
        Ok(bits.into_inner())
    }

    /// Construct an encoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            encoder: self,
            writer,
        }
    }

    /// Construct an encoder into an async writer.
    #[cfg(feature = "async")]
    pub fn into_async<W: futures::io::AsyncWrite + core::marker::Unpin>(
        &mut self,
        writer: W,
    ) -> IntoAsync<'_, W> {
        IntoAsync {
            encoder: self,
            writer,
        }
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Encode all data from a reader, followed by the end code.
    ///
    /// The writer is flushed once the last byte has been written.
    pub fn encode_all(self, mut read: impl BufRead) -> AllResult {
        let IntoStream { encoder, writer } = self;
        enum Progress {
            Ok,
            Done,
        }

        let mut bytes_read = 0;
        let mut state = EncodeState::new(encoder.header);
        let mut bits = BitWriter::new(writer);

        let read_bytes = &mut bytes_read;
        let state_ref = &mut state;
        let bits_ref = &mut bits;

        let status = state_ref.start(bits_ref).and_then(|()| {
            let once = move || -> io::Result<Progress> {
                let data = read.fill_buf()?;

                if data.is_empty() {
                    return Ok(Progress::Done);
                }

                state_ref.push(data, bits_ref)?;
                let consumed = data.len();
                *read_bytes += consumed;
                read.consume(consumed);
                Ok(Progress::Ok)
            };

            core::iter::repeat_with(once)
                // scan+fuse can be replaced with map_while
                .scan((), |(), result| match result {
                    Ok(Progress::Ok) => Some(Ok(())),
                    Err(err) => Some(Err(err)),
                    Ok(Progress::Done) => None,
                })
                .fuse()
                .collect::<io::Result<()>>()
        });

        let status = status
            .and_then(|()| state.finish(&mut bits))
            .and_then(|()| bits.close());

        encoder.stats = state.stats;
        AllResult {
            bytes_read,
            bytes_written: bits.bytes_written(),
            status,
        }
    }
}

#[cfg(feature = "async")]
impl<W: futures::io::AsyncWrite + core::marker::Unpin> IntoAsync<'_, W> {
    /// Encode all data from an async reader, followed by the end code.
    ///
    /// Compressed bytes are written after each chunk of input.
    pub async fn encode_all(
        self,
        mut read: impl futures::io::AsyncBufRead + core::marker::Unpin,
    ) -> AllResult {
        use futures::io::{AsyncBufReadExt, AsyncWriteExt};

        let IntoAsync {
            encoder,
            mut writer,
        } = self;

        let mut bytes_read = 0;
        let mut bytes_written = 0;
        let mut state = EncodeState::new(encoder.header);
        let mut bits = BitWriter::new(Vec::new());

        let status: io::Result<()> = async {
            state.start(&mut bits)?;
            loop {
                let data = read.fill_buf().await?;
                if data.is_empty() {
                    break;
                }

                state.push(data, &mut bits)?;
                let consumed = data.len();
                bytes_read += consumed;
                read.consume_unpin(consumed);

                let chunk = core::mem::take(bits.get_mut());
                writer.write_all(&chunk).await?;
                bytes_written += chunk.len();
            }

            state.finish(&mut bits)?;
            bits.close()?;
            let chunk = core::mem::take(bits.get_mut());
            writer.write_all(&chunk).await?;
            bytes_written += chunk.len();
            writer.flush().await
        }
        .await;

        encoder.stats = state.stats;
        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }
}

impl EncodeState {
    fn new(header: Header) -> Self {
        let size = CodeSize::new(header);
        EncodeState {
            header,
            size,
            tree: Tree::new(),
            current: ROOT,
            next_code: FIRST_CODE,
            saturated: false,
            stats: Stats {
                code_size: size.width(),
                ..Stats::default()
            },
        }
    }

    fn start<W: Write>(&mut self, bits: &mut BitWriter<W>) -> io::Result<()> {
        log::trace!("encoding with {:?}", self.header);
        self.header.write(bits)
    }

    fn push<W: Write>(&mut self, inp: &[u8], bits: &mut BitWriter<W>) -> io::Result<()> {
        for &byte in inp {
            match self.tree.successor(self.current, byte) {
                Some(next) if self.tree.is_entry(next) => self.current = next,
                _ => {
                    bits.write_bits(self.tree.code(self.current), self.size.width())?;
                    self.stats.codes += 1;
                    self.grow(byte);
                    self.current = Node::from(byte);
                }
            }
        }

        Ok(())
    }

    /// Add the current string extended by `byte` to the dictionary, if possible.
    fn grow(&mut self, byte: u8) {
        let growth = self.size.growth(self.next_code);
        match growth {
            Growth::Append => {}
            Growth::Widen => {
                log::debug!(
                    "code size {} -> {} at code {}",
                    self.size.width(),
                    self.size.width() + 1,
                    self.next_code
                );
                self.stats.widenings += 1;
            }
            Growth::Reset => {
                log::debug!(
                    "dictionary full at {} bits, resetting after {} codes",
                    self.size.width(),
                    self.stats.codes
                );
                // The string outlives the tree it was found in.
                let mut string = self.tree.bytes_of(self.current);
                string.push(byte);

                self.tree.reset();
                self.size.apply(growth);
                self.next_code = FIRST_CODE;
                self.tree.insert(&string, self.next_code);
                debug_assert_eq!(self.tree.lookup(&string), Some(FIRST_CODE));

                self.next_code += 1;
                self.stats.entries += 1;
                self.stats.resets += 1;
                return;
            }
            Growth::Full => {
                if !self.saturated {
                    log::debug!("dictionary full at {} bits, no more entries", self.size.width());
                    self.saturated = true;
                }
                return;
            }
        }

        self.size.apply(growth);
        self.tree.insert_after(self.current, byte, self.next_code);
        self.next_code += 1;
        self.stats.entries += 1;
    }

    fn finish<W: Write>(&mut self, bits: &mut BitWriter<W>) -> io::Result<()> {
        let end_size = if self.current == ROOT {
            self.size.width()
        } else {
            bits.write_bits(self.tree.code(self.current), self.size.width())?;
            self.stats.codes += 1;
            self.current = ROOT;
            // When reading this code, the decoder expects another table entry before the end
            // code. It picks the code size for the end code based on this entry.
            self.size.width_for(self.size.growth(self.next_code))
        };

        bits.write_bits(END_CODE, end_size)?;
        self.stats.code_size = self.size.width();
        log::trace!("encoded {:?}", self.stats);
        Ok(())
    }
}

impl Tree {
    fn new() -> Self {
        let mut tree = Tree::default();
        tree.init();
        tree
    }

    fn init(&mut self) {
        // The empty string is represented by the end code slot. It gets one complex mapping that
        // leads to the one-char base codes.
        let base = ROOT as usize + 1;
        self.keys.resize(base, FullKey::NoSuccessor);
        self.codes.extend(0..END_CODE);
        self.codes.push(NO_CODE);
        self.parents.extend((0..=255u8).map(|ch| (ROOT, ch)));
        self.parents.push((ROOT, 0));

        let mut map_of_begin = Full {
            char_continuation: [NO_NODE; 256],
        };
        for (ch, node) in map_of_begin.char_continuation.iter_mut().enumerate() {
            *node = ch as Node;
        }
        self.complex.push(map_of_begin);
        self.keys[ROOT as usize] = FullKey::Full(0);
    }

    fn reset(&mut self) {
        self.simples.clear();
        // Keep the mapping of the empty string.
        self.complex.truncate(1);
        let base = ROOT as usize + 1;
        self.keys.truncate(base);
        self.codes.truncate(base);
        self.parents.truncate(base);
        for k in self.keys[..ROOT as usize].iter_mut() {
            *k = FullKey::NoSuccessor;
        }
    }

    fn successor(&self, node: Node, ch: u8) -> Option<Node> {
        match self.keys[node as usize] {
            FullKey::NoSuccessor => None,
            FullKey::Simple(idx) => {
                let nexts = &self.simples[idx as usize];
                let successors = nexts
                    .nodes
                    .iter()
                    .zip(nexts.chars.iter())
                    .take(usize::from(nexts.count));
                for (&snode, &sch) in successors {
                    if sch == ch {
                        return Some(snode);
                    }
                }

                None
            }
            FullKey::Full(idx) => {
                let full = &self.complex[idx as usize];
                let next = full.char_continuation[usize::from(ch)];
                if next != NO_NODE {
                    Some(next)
                } else {
                    None
                }
            }
        }
    }

    /// If the string ending in `node` is in the dictionary.
    fn is_entry(&self, node: Node) -> bool {
        self.codes[node as usize] != NO_CODE
    }

    fn code(&self, node: Node) -> Code {
        self.codes[node as usize]
    }

    fn lookup(&self, string: &[u8]) -> Option<Code> {
        let mut node = ROOT;
        for &ch in string {
            node = self.successor(node, ch)?;
        }

        if self.is_entry(node) {
            Some(self.code(node))
        } else {
            None
        }
    }

    /// Insert a string, creating any of its prefixes that are missing from the tree.
    fn insert(&mut self, string: &[u8], code: Code) {
        debug_assert!(!string.is_empty());
        let mut node = ROOT;
        for &ch in string {
            node = match self.successor(node, ch) {
                Some(next) => next,
                None => self.append(node, ch),
            };
        }
        self.codes[node as usize] = code;
    }

    /// Insert the string of `node` extended by `ch`.
    fn insert_after(&mut self, node: Node, ch: u8, code: Code) {
        let next = match self.successor(node, ch) {
            Some(next) => next,
            None => self.append(node, ch),
        };
        self.codes[next as usize] = code;
    }

    fn bytes_of(&self, mut node: Node) -> Vec<u8> {
        let mut string = vec![];
        while node != ROOT {
            let (parent, ch) = self.parents[node as usize];
            string.push(ch);
            node = parent;
        }
        string.reverse();
        string
    }

    fn append(&mut self, node: Node, ch: u8) -> Node {
        let next = self.keys.len() as Node;
        match self.keys[node as usize] {
            FullKey::NoSuccessor => {
                let new_key = FullKey::Simple(self.simples.len() as u32);
                let mut simple = Simple::default();
                simple.nodes[0] = next;
                simple.chars[0] = ch;
                simple.count = 1;
                self.simples.push(simple);
                self.keys[node as usize] = new_key;
            }
            FullKey::Simple(idx) if usize::from(self.simples[idx as usize].count) < SHORT => {
                let nexts = &mut self.simples[idx as usize];
                let nidx = usize::from(nexts.count);
                nexts.chars[nidx] = ch;
                nexts.nodes[nidx] = next;
                nexts.count += 1;
            }
            FullKey::Simple(idx) => {
                let new_key = FullKey::Full(self.complex.len() as u32);
                let simples = &self.simples[idx as usize];
                let mut full = Full {
                    char_continuation: [NO_NODE; 256],
                };
                for (&pch, &pnode) in simples.chars.iter().zip(simples.nodes.iter()) {
                    full.char_continuation[usize::from(pch)] = pnode;
                }
                full.char_continuation[usize::from(ch)] = next;
                self.complex.push(full);
                self.keys[node as usize] = new_key;
            }
            FullKey::Full(idx) => {
                let full = &mut self.complex[idx as usize];
                full.char_continuation[usize::from(ch)] = next;
            }
        }
        self.keys.push(FullKey::NoSuccessor);
        self.codes.push(NO_CODE);
        self.parents.push((node, ch));
        next
    }
}

impl Default for Simple {
    fn default() -> Self {
        Simple {
            nodes: [0; SHORT],
            chars: [0; SHORT],
            count: 0,
        }
    }
}
