use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// Instruction set. Each instruction is one word, optionally followed
        /// by one operand word.
        #[repr(i32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// Load the operand into AC
    LOADV = 1,
    /// Load the value at the operand address into AC
    LOADA = 2,
    /// Load the value at the address stored at the operand address into AC
    LOADIND = 3,
    /// Load the value at (operand + X) into AC
    LOADIDXX = 4,
    /// Load the value at (operand + Y) into AC
    LOADIDXY = 5,
    /// Load the value at (SP + X) into AC
    LOADSPX = 6,
    /// Store AC at the operand address
    STORE = 7,
    /// Random number in 1..=100 into AC. Takes no operand; the next word is
    /// the next instruction
    GET = 8,
    /// Print AC. Operand 1 prints a number, 2 prints a character
    PUT = 9,
    /// AC += X
    ADDX = 10,
    /// AC += Y
    ADDY = 11,
    /// AC -= X
    SUBX = 12,
    /// AC -= Y
    SUBY = 13,
    /// X = AC
    COPYTOX = 14,
    /// AC = X
    COPYFROMX = 15,
    /// Y = AC
    COPYTOY = 16,
    /// AC = Y
    COPYFROMY = 17,
    /// SP = AC
    COPYTOSP = 18,
    /// AC = SP
    COPYFROMSP = 19,
    /// Jump to the operand address
    JUMP = 20,
    /// Jump to the operand address if AC is zero
    JUMPEQ = 21,
    /// Jump to the operand address if AC is not zero
    JUMPNE = 22,
    /// Push the return address and jump to the operand address
    CALL = 23,
    /// Pop the return address into PC
    RET = 24,
    /// X += 1
    INCX = 25,
    /// X -= 1
    DECX = 26,
    /// Push AC
    PUSH = 27,
    /// Pop into AC
    POP = 28,
    /// System call
    INT = 29,
    /// Return from a system call or interrupt
    IRET = 30,
    /// Halt the machine
    END = 50,
}
