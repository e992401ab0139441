//! Generated code for the fixture schemas in `schemas/`.
//!
//! `v1` and `v2` are two versions of the same world; `v2` adds fields and a
//! table. The tests in `tests/` check the storage and codec behavior of the
//! generated modules.

pub mod math {
    use tablec_wire::{WireError, WireKind, WireValue};

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Vec2 {
        pub x: f32,
        pub y: f32,
    }

    impl Vec2 {
        pub fn new(x: f32, y: f32) -> Self {
            Vec2 { x, y }
        }
    }

    impl WireValue for Vec2 {
        const KIND: WireKind = WireKind::Fixed(8);

        fn encode(&self, out: &mut Vec<u8>) {
            self.x.encode(out);
            self.y.encode(out);
        }

        fn decode(bytes: &[u8]) -> Result<Self, WireError> {
            if bytes.len() != 8 {
                return Err(WireError::Length {
                    expected: 8,
                    actual: bytes.len(),
                });
            }
            Ok(Vec2 {
                x: f32::decode(&bytes[..4])?,
                y: f32::decode(&bytes[4..])?,
            })
        }
    }

    /// Stand-in for a GPU resource; only ever held through pointers.
    #[derive(Debug, Default)]
    pub struct Texture {
        pub path: String,
    }
}

pub mod v1 {
    pub mod world {
        include!(concat!(env!("OUT_DIR"), "/v1/world.rs"));
    }

    pub mod serialization {
        include!(concat!(env!("OUT_DIR"), "/v1/serialization.rs"));
    }

    impl world::Damageable for world::Health {
        fn hit_points(&self) -> i32 {
            self.current
        }
    }

    impl world::Damageable for world::Shield {
        fn hit_points(&self) -> i32 {
            self.strength
        }
    }
}

pub mod v2 {
    pub mod world {
        include!(concat!(env!("OUT_DIR"), "/v2/world.rs"));
    }

    pub mod serialization {
        include!(concat!(env!("OUT_DIR"), "/v2/serialization.rs"));
    }
}

/// Copy `text` into a fixed name field, truncating.
pub fn name(text: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (dst, src) in out.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    out
}
