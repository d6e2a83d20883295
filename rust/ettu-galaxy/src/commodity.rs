//! Tradeable commodities of the galaxy catalog.

use ettu_common::Result;
use ettu_format::{
    Builder, FieldId, Offset, Table,
    verifier::{Verifier, Verify},
};
use serde::{Deserialize, Serialize};

use crate::to_owned_str;

/// Reader for a commodity table.
#[derive(Clone, Copy)]
pub struct CommodityRef<'a>(Table<'a>);

ettu_format::table_ref!(CommodityRef);

impl<'a> CommodityRef<'a> {
    pub const COMMODITY_ID: FieldId = 0;
    pub const NAME: FieldId = 1;
    pub const CATEGORY: FieldId = 2;
    pub const AVERAGE_PRICE: FieldId = 3;
    pub const FDEV_ID: FieldId = 4;
    pub const FIELD_COUNT: FieldId = 5;

    pub fn commodity_id(&self) -> Result<u32> {
        self.0.get(Self::COMMODITY_ID, 0)
    }

    pub fn name(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::NAME)
    }

    pub fn category(&self) -> Result<Option<&'a str>> {
        self.0.get_str(Self::CATEGORY)
    }

    /// Galactic average price in credits.
    pub fn average_price(&self) -> Result<u32> {
        self.0.get(Self::AVERAGE_PRICE, 0)
    }

    /// Identifier assigned by the game publisher.
    pub fn fdev_id(&self) -> Result<u32> {
        self.0.get(Self::FDEV_ID, 0)
    }

    pub fn unpack(&self) -> Result<Commodity> {
        Ok(Commodity {
            commodity_id: self.commodity_id()?,
            name: to_owned_str(self.name()?),
            category: to_owned_str(self.category()?),
            average_price: self.average_price()?,
            fdev_id: self.fdev_id()?,
        })
    }
}

impl<'a> Verify<'a> for CommodityRef<'a> {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()> {
        v.verify_scalar::<u32>(table, Self::COMMODITY_ID)?;
        v.verify_string(table, Self::NAME)?;
        v.verify_string(table, Self::CATEGORY)?;
        v.verify_scalar::<u32>(table, Self::AVERAGE_PRICE)?;
        v.verify_scalar::<u32>(table, Self::FDEV_ID)
    }
}

impl std::fmt::Debug for CommodityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommodityRef")
            .field("commodity_id", &self.commodity_id().ok())
            .field("name", &self.name().ok().flatten())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commodity {
    pub commodity_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub average_price: u32,
    pub fdev_id: u32,
}

impl Commodity {
    pub fn new(commodity_id: u32, name: impl Into<String>, category: impl Into<String>) -> Commodity {
        Commodity {
            commodity_id,
            name: Some(name.into()),
            category: Some(category.into()),
            ..Default::default()
        }
    }

    /// Writes the commodity. Categories repeat across the catalog and are
    /// written once per builder.
    pub fn pack(&self, builder: &mut Builder) -> Offset<Commodity> {
        let name = self.name.as_deref().map(|s| builder.create_string(s));
        let category = self
            .category
            .as_deref()
            .map(|s| builder.create_shared_string(s));

        builder.start_table(CommodityRef::FIELD_COUNT);
        builder.add_scalar(CommodityRef::COMMODITY_ID, self.commodity_id, 0);
        builder.add_offset_opt(CommodityRef::NAME, name);
        builder.add_offset_opt(CommodityRef::CATEGORY, category);
        builder.add_scalar(CommodityRef::AVERAGE_PRICE, self.average_price, 0);
        builder.add_scalar(CommodityRef::FDEV_ID, self.fdev_id, 0);
        builder.end_table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ettu_format::{TableRef, options::VerifierOptions, root_table};

    #[test]
    fn test_pack_unpack() {
        let commodity = Commodity {
            average_price: 9_401,
            fdev_id: 128_049_152,
            ..Commodity::new(42, "Platinum", "Metals")
        };
        let mut builder = Builder::new();
        let root = commodity.pack(&mut builder);
        builder.finish(root, None);
        let buf = builder.finished_data();

        let reader = crate::open_verified::<CommodityRef>(buf, &VerifierOptions::default(), None)
            .unwrap();
        assert_eq!(reader.name().unwrap(), Some("Platinum"));
        assert_eq!(reader.unpack().unwrap(), commodity);
    }

    #[test]
    fn test_shared_category() {
        let mut builder = Builder::new();
        let a = Commodity::new(1, "Gold", "Metals").pack(&mut builder);
        let b = Commodity::new(2, "Silver", "Metals").pack(&mut builder);
        let v = builder.create_vector_of_offsets(&[a, b]);
        builder.start_table(1);
        builder.add_offset(0, v);
        let root = builder.end_table::<()>();
        builder.finish(root, None);
        assert_eq!(builder.stats().shared_strings_reused, 1);

        let buf = builder.finished_data();
        let items = root_table(buf)
            .unwrap()
            .get_vector::<CommodityRef>(0)
            .unwrap()
            .unwrap();
        let first = items.get(0).unwrap();
        let second = items.get(1).unwrap();
        let category_pos = |c: CommodityRef| {
            c.table()
                .field_position(CommodityRef::CATEGORY, 4)
                .unwrap()
                .map(|pos| ettu_format::codec::read_uoffset(buf, pos).unwrap())
        };
        assert_eq!(category_pos(first), category_pos(second));
        assert_eq!(second.category().unwrap(), Some("Metals"));
    }

    #[test]
    fn test_defaults_are_omitted() {
        let mut builder = Builder::new();
        let root = Commodity::default().pack(&mut builder);
        builder.finish(root, None);
        let table = root_table(builder.finished_data()).unwrap();
        assert_eq!(table.vtable().num_slots(), 0);
        let reader = CommodityRef::from_table(table);
        assert_eq!(reader.unpack().unwrap(), Commodity::default());
    }
}
