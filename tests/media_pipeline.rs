use ehm::assertion::{scoped, scoped_with_hook, AssertPolicy};
use ehm::averror::{AVERROR_EOF, AVERROR_INVALIDDATA};
use ehm::error::{to_status, ERR_CHECK_FAILED, ERR_MISSING_VALUE};
use ehm::graphics::{GL_INVALID_FRAMEBUFFER_OPERATION, GL_NO_ERROR};
use ehm::prelude::*;
use env_logger::{Builder, Env};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn init_logger() {
  let _ = Builder::from_env(Env::default().default_filter_or("trace"))
    .is_test(true)
    .try_init();
}

#[derive(Debug)]
struct Packet {
  stream_index: usize,
  data: Vec<u8>,
}

struct Decoder {
  streams: usize,
  opened: Cell<u32>,
  closed: Cell<u32>,
}

impl Decoder {
  fn new(streams: usize) -> Self {
    Decoder {
      streams,
      opened: Cell::new(0),
      closed: Cell::new(0),
    }
  }

  fn decode_all(&self, packets: &[Option<Packet>]) -> Result<usize, Error> {
    self.opened.set(self.opened.get() + 1);

    Scope::new()
      .on_done(|| self.closed.set(self.closed.get() + 1))
      .run(|| {
        check!(!packets.is_empty());

        let mut decoded = 0;
        for packet in packets {
          check_continue!(packet.is_some());
          let packet = check_ptr!(packet.as_ref());
          check_continue!(packet.stream_index < self.streams);
          check_continue!(!packet.data.is_empty());
          decoded += packet.data.len();
        }
        check!(decoded > 0);
        Ok(decoded)
      })
  }

  fn read_status(&self, status: i32) -> Result<(), Error> {
    check_result!(status, {
      self.closed.set(self.closed.get() + 1);
    });
    Ok(())
  }
}

struct Surface {
  errors: Vec<u32>,
}

impl GraphicsContext for Surface {
  fn get_error(&mut self) -> GlError {
    GlError(self.errors.pop().unwrap_or(GL_NO_ERROR))
  }
}

#[test]
fn decode_skips_malformed_packets() {
  init_logger();

  let decoder = Decoder::new(2);
  let packets = vec![
    Some(Packet {
      stream_index: 0,
      data: vec![1, 2, 3],
    }),
    None,
    Some(Packet {
      stream_index: 5,
      data: vec![9; 100],
    }),
    Some(Packet {
      stream_index: 1,
      data: vec![],
    }),
    Some(Packet {
      stream_index: 1,
      data: vec![4, 5],
    }),
  ];

  assert_eq!(decoder.decode_all(&packets), Ok(5));
  assert_eq!(decoder.opened.get(), 1);
  assert_eq!(decoder.closed.get(), 1);
}

#[test]
fn decode_failure_is_reported_and_cleaned_up() {
  init_logger();

  let decoder = Decoder::new(1);
  let error = decoder.decode_all(&[]).unwrap_err();
  assert_eq!(error.code, ERR_CHECK_FAILED);
  assert_eq!(error.domain, error_domain());
  assert_eq!(error.user_info["expression"], "!packets.is_empty()");
  assert_eq!(to_status(&Err::<(), _>(error)), ERR_CHECK_FAILED);

  let only_broken = vec![None, None];
  let error = decoder.decode_all(&only_broken).unwrap_err();
  assert_eq!(error.user_info["expression"], "decoded > 0");

  assert_eq!(decoder.closed.get(), 2);
}

#[test]
fn missing_values_map_to_their_own_code() {
  fn first_stream(streams: &[u32]) -> Result<u32, Error> {
    let stream = check_ptr!(streams.first());
    Ok(*stream)
  }

  assert_eq!(first_stream(&[3]), Ok(3));
  let error = first_stream(&[]).unwrap_err();
  assert_eq!(error.code, ERR_MISSING_VALUE);
  assert_ne!(error.code, ERR_SUCCESS);
}

#[test]
fn status_codes_release_before_returning() {
  init_logger();

  let decoder = Decoder::new(1);
  assert!(decoder.read_status(ERR_SUCCESS).is_ok());
  assert_eq!(decoder.closed.get(), 0);

  let error = decoder.read_status(AVERROR_INVALIDDATA).unwrap_err();
  assert_eq!(error.code, AVERROR_INVALIDDATA);
  assert_eq!(decoder.closed.get(), 1);

  assert_eq!(
    decoder.read_status(AVERROR_EOF).unwrap_err().message,
    "End of file"
  );
}

#[test]
fn asserting_checks_follow_the_policy() {
  init_logger();

  fn open(path: Option<&str>) -> Result<usize, Error> {
    let path = check_ptr_assert!(path);
    check_assert!(path.ends_with(".mp4"));
    Ok(path.len())
  }

  let raised = Rc::new(RefCell::new(vec![]));
  {
    let recorder = raised.clone();
    let _guard = scoped_with_hook(AssertPolicy::Log, move |diagnostic| {
      recorder.borrow_mut().push(diagnostic.message.clone())
    });
    assert!(open(None).is_err());
    assert!(open(Some("clip.mov")).is_err());
    assert_eq!(open(Some("clip.mp4")), Ok(8));
  }
  let raised = raised.borrow();
  assert_eq!(raised.len(), 2);
  assert!(raised[0].starts_with("ERROR: `path` is missing at tests/media_pipeline.rs:"));
  assert!(raised[1].starts_with("ERROR: check `path.ends_with(\".mp4\")` failed"));

  let _guard = scoped(AssertPolicy::Ignore);
  assert_eq!(open(None).unwrap_err().code, ERR_MISSING_VALUE);
}

#[test]
fn graphics_errors_are_diagnosed() {
  init_logger();

  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |diagnostic| {
    assert!(diagnostic.message.starts_with("OGL ERROR"));
    counter.set(counter.get() + 1);
  });

  let mut surface = Surface {
    errors: vec![GL_INVALID_FRAMEBUFFER_OPERATION],
  };
  verify_gl!(surface);
  verify_gl!(surface);
  assert_eq!(count.get(), 1);
}

#[test]
#[should_panic(expected = "frame count mismatch")]
fn hard_assertion_aborts_under_panic_policy() {
  let _guard = scoped(AssertPolicy::Panic);
  let frames = 3;
  verify!(frames == 4, "frame count mismatch: {}", frames);
}
