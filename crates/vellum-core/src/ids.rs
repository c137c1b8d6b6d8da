//! Small index newtypes used throughout the grammar and automaton layers.

macro_rules! index_newtype {
  ($name:ident) => {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct $name(pub u32);

    impl $name {
      pub fn as_usize(self) -> usize {
        self.0 as usize
      }
    }

    impl From<u32> for $name {
      fn from(v: u32) -> Self {
        Self(v)
      }
    }
  };
}

index_newtype!(TermId);
index_newtype!(NonTermId);
index_newtype!(RuleId);
index_newtype!(IntFaId);
index_newtype!(GlaId);
index_newtype!(StringId);
