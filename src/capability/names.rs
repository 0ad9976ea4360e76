//! Closed enumerations of capability names.
//!
//! Each variant maps to its terminfo short name (`am`, `cols`, `cup`, ...).
//! Names not listed here are ignored when parsing capability sources.

use std::fmt;
use std::str::FromStr;

use crate::error::TtyError;

macro_rules! capabilities {
    (
        $(#[$meta:meta])*
        $vis:vis enum $Enum:ident { $($variant:ident => $name:literal,)* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $Enum {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl $Enum {
            /// Every capability of this kind.
            pub const ALL: &'static [$Enum] = &[$($Enum::$variant,)*];

            /// Terminfo short name.
            pub fn name(self) -> &'static str {
                match self {
                    $($Enum::$variant => $name,)*
                }
            }

            /// Look up a capability by its terminfo short name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some($Enum::$variant),)*
                    _ => None,
                }
            }
        }

        impl fmt::Display for $Enum {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $Enum {
            type Err = TtyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s).ok_or_else(|| TtyError::unknown("capability", s))
            }
        }
    };
}

capabilities! {
    /// Boolean capabilities.
    pub enum BoolCap {
        AutoLeftMargin => "bw",
        AutoRightMargin => "am",
        BackColorErase => "bce",
        CanChange => "ccc",
        EatNewlineGlitch => "xenl",
        HasMetaKey => "km",
        HasStatusLine => "hs",
        InsertNullGlitch => "in",
        MoveInsertMode => "mir",
        MoveStandoutMode => "msgr",
        NoPadChar => "npc",
        OverStrike => "os",
        PrtrSilent => "mc5i",
        StatusLineEscOk => "eslok",
        XonXoff => "xon",
        BackspacesWithBs => "OTbs",
        GenericType => "gn",
        HardCopy => "hc",
    }
}

capabilities! {
    /// Numeric capabilities.
    pub enum NumCap {
        Columns => "cols",
        InitTabs => "it",
        Lines => "lines",
        LinesOfMemory => "lm",
        MaxColors => "colors",
        MaxPairs => "pairs",
        NoColorVideo => "ncv",
        PaddingBaudRate => "pb",
        VirtualTerminal => "vt",
        WidthStatusLine => "wsl",
    }
}

capabilities! {
    /// String capabilities.
    pub enum StrCap {
        AcsChars => "acsc",
        BackTab => "cbt",
        Bell => "bel",
        CarriageReturn => "cr",
        ChangeScrollRegion => "csr",
        ClearAllTabs => "tbc",
        ClearScreen => "clear",
        ClrBol => "el1",
        ClrEol => "el",
        ClrEos => "ed",
        ColumnAddress => "hpa",
        CursorAddress => "cup",
        CursorDown => "cud1",
        CursorHome => "home",
        CursorInvisible => "civis",
        CursorLeft => "cub1",
        CursorNormal => "cnorm",
        CursorRight => "cuf1",
        CursorUp => "cuu1",
        CursorVisible => "cvvis",
        DeleteCharacter => "dch1",
        DeleteLine => "dl1",
        DisStatusLine => "dsl",
        EnterAltCharsetMode => "smacs",
        EnterAmMode => "smam",
        EnterBlinkMode => "blink",
        EnterBoldMode => "bold",
        EnterCaMode => "smcup",
        EnterDimMode => "dim",
        EnterInsertMode => "smir",
        EnterItalicsMode => "sitm",
        EnterReverseMode => "rev",
        EnterSecureMode => "invis",
        EnterStandoutMode => "smso",
        EnterUnderlineMode => "smul",
        EraseChars => "ech",
        ExitAltCharsetMode => "rmacs",
        ExitAmMode => "rmam",
        ExitAttributeMode => "sgr0",
        ExitCaMode => "rmcup",
        ExitInsertMode => "rmir",
        ExitItalicsMode => "ritm",
        ExitStandoutMode => "rmso",
        ExitUnderlineMode => "rmul",
        FlashScreen => "flash",
        FromStatusLine => "fsl",
        Init2String => "is2",
        InsertCharacter => "ich1",
        InsertLine => "il1",
        KeyBackspace => "kbs",
        KeyBtab => "kcbt",
        KeyDc => "kdch1",
        KeyDown => "kcud1",
        KeyEnd => "kend",
        KeyEnter => "kent",
        KeyF1 => "kf1",
        KeyF2 => "kf2",
        KeyF3 => "kf3",
        KeyF4 => "kf4",
        KeyF5 => "kf5",
        KeyF6 => "kf6",
        KeyF7 => "kf7",
        KeyF8 => "kf8",
        KeyF9 => "kf9",
        KeyF10 => "kf10",
        KeyF11 => "kf11",
        KeyF12 => "kf12",
        KeyHome => "khome",
        KeyIc => "kich1",
        KeyLeft => "kcub1",
        KeyMouse => "kmous",
        KeyNpage => "knp",
        KeyPpage => "kpp",
        KeyRight => "kcuf1",
        KeyUp => "kcuu1",
        KeypadLocal => "rmkx",
        KeypadXmit => "smkx",
        Newline => "nel",
        OrigPair => "op",
        ParmDch => "dch",
        ParmDeleteLine => "dl",
        ParmDownCursor => "cud",
        ParmIch => "ich",
        ParmIndex => "indn",
        ParmInsertLine => "il",
        ParmLeftCursor => "cub",
        ParmRightCursor => "cuf",
        ParmRindex => "rin",
        ParmUpCursor => "cuu",
        Reset1String => "rs1",
        Reset2String => "rs2",
        RestoreCursor => "rc",
        RowAddress => "vpa",
        SaveCursor => "sc",
        ScrollForward => "ind",
        ScrollReverse => "ri",
        SetABackground => "setab",
        SetAForeground => "setaf",
        SetAttributes => "sgr",
        SetTab => "hts",
        Tab => "ht",
        ToStatusLine => "tsl",
        User6 => "u6",
        User7 => "u7",
        User8 => "u8",
        User9 => "u9",
    }
}
