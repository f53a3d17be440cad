use std::sync::Arc;

use aligned_vec::{AVec, ConstAlign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type A64 = ConstAlign<64>;

macro_rules! avec_serde {
    ($ser:ident, $de:ident, $ty:ty) => {
        pub fn $ser<S>(
            data: &Arc<AVec<$ty, A64>>,
            serializer: S,
        ) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            data.as_slice().serialize(serializer)
        }

        pub fn $de<'de, D>(deserializer: D) -> std::result::Result<Arc<AVec<$ty, A64>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let vec = Vec::<$ty>::deserialize(deserializer)?;
            Ok(Arc::new(AVec::from_iter(64, vec)))
        }
    };
}

avec_serde!(serialize_avec_i32, deserialize_avec_i32, i32);
avec_serde!(serialize_avec_i64, deserialize_avec_i64, i64);
avec_serde!(serialize_avec_f32, deserialize_avec_f32, f32);
avec_serde!(serialize_avec_f64, deserialize_avec_f64, f64);
